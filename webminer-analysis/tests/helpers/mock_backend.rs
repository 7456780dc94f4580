//! Scripted search backend and tag source

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use webminer_analysis::backends::{
    format_query, BackendError, HitCount, HitCountRequest, SearchBackend, SearchOptions, TagSource,
};

/// One recorded submission
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub terms: Vec<String>,
    pub site: Option<String>,
}

/// Shared view of a backend's submissions, usable after the backend is boxed
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }
}

fn key(terms: &[&str]) -> Vec<String> {
    let mut key: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
    key.sort();
    key
}

/// Answers from a table keyed by the (unordered) query terms
pub struct MockBackend {
    name: String,
    counts: HashMap<Vec<String>, u64>,
    site_factors: HashMap<String, u64>,
    default_count: u64,
    failure: Option<fn() -> BackendError>,
    options: SearchOptions,
    log: CallLog,
}

impl MockBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            counts: HashMap::new(),
            site_factors: HashMap::new(),
            default_count: 0,
            failure: None,
            options: SearchOptions::default(),
            log: CallLog::default(),
        }
    }

    /// Hit count for a query whose synonym groups are exactly `terms`
    pub fn with_count(mut self, terms: &[&str], count: u64) -> Self {
        self.counts.insert(key(terms), count);
        self
    }

    pub fn with_default(mut self, count: u64) -> Self {
        self.default_count = count;
        self
    }

    /// Multiply every count for `site` by `factor`
    pub fn with_site_factor(mut self, site: &str, factor: u64) -> Self {
        self.site_factors.insert(site.to_string(), factor);
        self
    }

    /// Fail every query with the given error
    pub fn failing(mut self, error: fn() -> BackendError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn boxed(self) -> Box<dyn SearchBackend> {
        Box::new(self)
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, options: &SearchOptions) -> Result<(), BackendError> {
        options.validate()?;
        self.options = options.clone();
        Ok(())
    }

    async fn hit_count(&self, request: &HitCountRequest<'_>) -> Result<HitCount, BackendError> {
        self.log.push(Call {
            terms: request.terms.to_vec(),
            site: request.site.map(str::to_string),
        });

        if let Some(error) = self.failure {
            return Err(error());
        }

        let terms: Vec<&str> = request.terms.iter().map(String::as_str).collect();
        let base = self.counts.get(&key(&terms)).copied().unwrap_or(self.default_count);
        let factor = request
            .site
            .and_then(|s| self.site_factors.get(s))
            .copied()
            .unwrap_or(1);

        Ok(HitCount {
            count: base * factor,
            literal_query: format_query(request.terms, &self.options, request.site),
        })
    }
}

/// Tag source answering from a fixed table
pub struct MockTagSource {
    tags: HashMap<String, Vec<String>>,
}

impl MockTagSource {
    pub fn new(entries: &[(&str, &[&str])]) -> Self {
        Self {
            tags: entries
                .iter()
                .map(|(term, tags)| (term.to_string(), tags.iter().map(|t| t.to_string()).collect()))
                .collect(),
        }
    }
}

#[async_trait]
impl TagSource for MockTagSource {
    fn name(&self) -> &str {
        "mock tags"
    }

    async fn top_tags(&self, term: &str) -> Result<Vec<String>, BackendError> {
        Ok(self.tags.get(term).cloned().unwrap_or_default())
    }
}
