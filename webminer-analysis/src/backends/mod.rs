//! Search backends
//!
//! The engine is polymorphic over [`SearchBackend`]: anything able to turn an
//! ordered list of query terms (plus an optional site restriction) into a
//! non-negative hit count. [`TagSource`] is the analogous capability for
//! ranked tag lists.

pub mod http_search;
pub mod lastfm;

pub use http_search::{HttpSearchBackend, HttpSearchConfig};
pub use lastfm::LastFmTagSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value meaning "no restriction" for the list-valued search options
pub const NO_LIMITATIONS: &str = "No Limitations";

/// Languages results may be limited to
pub const INCLUDED_LANGUAGES: &[&str] = &[
    NO_LIMITATIONS,
    "English",
    "French",
    "Spanish",
    "Portuguese",
    "German",
    "Chinese",
    "Japanese",
    "Turkish",
    "Arabic",
];

/// Countries results may be limited to (also valid search regions)
pub const INCLUDED_COUNTRIES: &[&str] = &[
    NO_LIMITATIONS,
    "Canada",
    "U.S.A.",
    "U.K.",
    "France",
    "Spain",
    "Germany",
    "Austria",
    "Brazil",
    "Japan",
    "China",
    "Turkey",
];

/// File types results may be limited to
pub const INCLUDED_FILE_TYPES: &[&str] =
    &[NO_LIMITATIONS, "html", "txt", "pdf", "doc", "ppt", "xls", "rss"];

/// Backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid search option: {0}")]
    InvalidOption(String),

    #[error("API key not configured for {0}")]
    MissingApiKey(String),
}

impl BackendError {
    /// Whether another attempt at the same query may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Network(_) | BackendError::RateLimited | BackendError::Parse(_) => true,
            BackendError::Api(status, _) => *status >= 500 || *status == 429,
            BackendError::InvalidOption(_) | BackendError::MissingApiKey(_) => false,
        }
    }
}

/// Search options applied to every query of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Quote each query term so it is matched as a phrase
    pub literal: bool,
    /// Combine query terms with OR instead of AND
    pub or_based: bool,
    /// Include similar but non-matching strings
    pub include_near_matches: bool,
    pub suppress_similar_hits: bool,
    pub suppress_adult_content: bool,
    pub language: String,
    pub country: String,
    pub search_region: String,
    pub file_type: String,
    /// Strings every hit must not contain
    pub excluded: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            literal: true,
            or_based: false,
            include_near_matches: false,
            suppress_similar_hits: false,
            suppress_adult_content: false,
            language: NO_LIMITATIONS.to_string(),
            country: NO_LIMITATIONS.to_string(),
            search_region: NO_LIMITATIONS.to_string(),
            file_type: NO_LIMITATIONS.to_string(),
            excluded: Vec::new(),
        }
    }
}

impl SearchOptions {
    /// Check list-valued options against the permitted values
    pub fn validate(&self) -> Result<(), BackendError> {
        check_allowed("language", &self.language, INCLUDED_LANGUAGES)?;
        check_allowed("country", &self.country, INCLUDED_COUNTRIES)?;
        check_allowed("search region", &self.search_region, INCLUDED_COUNTRIES)?;
        check_allowed("file type", &self.file_type, INCLUDED_FILE_TYPES)?;
        if self.excluded.iter().any(|e| e.trim().is_empty()) {
            return Err(BackendError::InvalidOption(
                "Blank search exclusion string specified".to_string(),
            ));
        }
        Ok(())
    }

    pub fn file_type_limit(&self) -> Option<&str> {
        limited(&self.file_type)
    }

    pub fn language_code(&self) -> Option<&'static str> {
        let code = match self.language.as_str() {
            "English" => "en",
            "French" => "fr",
            "Spanish" => "es",
            "Portuguese" => "pt",
            "German" => "de",
            "Chinese" => "zh",
            "Japanese" => "ja",
            "Turkish" => "tr",
            "Arabic" => "ar",
            _ => return None,
        };
        Some(code)
    }

    pub fn country_code(&self) -> Option<&'static str> {
        country_code(&self.country)
    }

    pub fn search_region_code(&self) -> Option<&'static str> {
        country_code(&self.search_region)
    }
}

fn country_code(country: &str) -> Option<&'static str> {
    let code = match country {
        "Canada" => "CA",
        "U.S.A." => "US",
        "U.K." => "GB",
        "France" => "FR",
        "Spain" => "ES",
        "Germany" => "DE",
        "Austria" => "AT",
        "Brazil" => "BR",
        "Japan" => "JP",
        "China" => "CN",
        "Turkey" => "TR",
        _ => return None,
    };
    Some(code)
}

fn limited(value: &str) -> Option<&str> {
    if value == NO_LIMITATIONS {
        None
    } else {
        Some(value)
    }
}

fn check_allowed(option: &str, value: &str, allowed: &[&str]) -> Result<(), BackendError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(BackendError::InvalidOption(format!(
            "{} of '{}' is not permitted",
            option, value
        )))
    }
}

/// One hit-count question posed to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitCountRequest<'a> {
    /// One entry per synonym group, then required filters
    pub terms: &'a [String],
    /// Domain to restrict to; `None` searches the whole network
    pub site: Option<&'a str>,
}

/// A backend's answer: the count and the literal query submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitCount {
    pub count: u64,
    pub literal_query: String,
}

/// Hit-counting capability
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Backend name for logs and reports
    fn name(&self) -> &str;

    /// Apply run-wide search options; called once before collection
    fn configure(&mut self, options: &SearchOptions) -> Result<(), BackendError>;

    /// Single attempt at counting hits for a query
    async fn hit_count(&self, request: &HitCountRequest<'_>) -> Result<HitCount, BackendError>;
}

/// Ranked-tag capability (e.g. an artist's top tags)
#[async_trait]
pub trait TagSource: Send + Sync {
    fn name(&self) -> &str;

    /// Tags for `term`, most relevant first
    async fn top_tags(&self, term: &str) -> Result<Vec<String>, BackendError>;
}

/// Build the literal query string for `terms`.
///
/// Terms are joined with a space (AND) or ` OR `. In literal mode unquoted
/// terms are quoted; already-quoted terms are kept, or split into OR-joined
/// words in OR mode. Exclusions, site and file type restrictions follow.
pub fn format_query(terms: &[String], options: &SearchOptions, site: Option<&str>) -> String {
    let joiner = if options.or_based { " OR " } else { " " };

    let mut query = terms
        .iter()
        .map(|term| {
            let quoted = term.starts_with('"') || term.ends_with('"');
            if !options.literal {
                term.clone()
            } else if !quoted {
                format!("\"{}\"", term)
            } else if options.or_based {
                term.split_whitespace().collect::<Vec<_>>().join(" OR ")
            } else {
                term.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(joiner);

    for excluded in &options.excluded {
        query.push_str(&format!(" -\"{}\"", excluded));
    }
    if let Some(site) = site {
        query.push_str(" site:");
        query.push_str(site);
    }
    if let Some(file_type) = options.file_type_limit() {
        query.push_str(" filetype:");
        query.push_str(file_type);
    }
    query
}
