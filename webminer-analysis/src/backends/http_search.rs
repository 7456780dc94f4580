//! Generic JSON web-search backend
//!
//! Submits the formatted query to an HTTP endpoint and reads the estimated
//! total hit count from the JSON response through a JSON pointer. Request
//! parameters for language, country, region, safe search and similar-hit
//! filtering follow Google Custom Search naming (`lr`, `cr`, `gl`, `safe`,
//! `filter`), which most compatible endpoints accept.

use super::{format_query, BackendError, HitCount, HitCountRequest, SearchBackend, SearchOptions};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::time::Duration;

const USER_AGENT: &str = concat!("webminer/", env!("CARGO_PKG_VERSION"));

/// HTTP search backend settings (one `[[backends]]` table)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HttpSearchConfig {
    /// Backend name for logs and reports
    pub name: String,
    /// Search endpoint URL
    pub endpoint: String,
    /// Query-string parameter carrying the formatted query
    #[serde(default = "default_query_param")]
    pub query_param: String,
    /// Parameter carrying the API key; empty for keyless endpoints
    #[serde(default = "default_api_key_param")]
    pub api_key_param: Option<String>,
    /// API key (TOML value, overridden by the environment)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// JSON pointer to the total hit count (number or numeric string)
    #[serde(default = "default_count_pointer")]
    pub count_pointer: String,
    /// Fixed parameters sent with every request (e.g. search engine id)
    #[serde(default)]
    pub extra_params: BTreeMap<String, String>,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_query_param() -> String {
    "q".to_string()
}

fn default_api_key_param() -> Option<String> {
    Some("key".to_string())
}

fn default_count_pointer() -> String {
    "/searchInformation/totalResults".to_string()
}

fn default_requests_per_second() -> u32 {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

/// Web search backend over a JSON HTTP API
pub struct HttpSearchBackend {
    config: HttpSearchConfig,
    options: SearchOptions,
    http_client: reqwest::Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpSearchBackend {
    pub fn new(mut config: HttpSearchConfig) -> Result<Self, BackendError> {
        // An empty parameter name marks a keyless endpoint
        config.api_key_param = config.api_key_param.filter(|p| !p.trim().is_empty());

        if config.api_key_param.is_some()
            && config.api_key.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            return Err(BackendError::MissingApiKey(config.name.clone()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            config,
            options: SearchOptions::default(),
            http_client,
            rate_limiter,
        })
    }

    /// Query-string parameters for one request
    fn request_params(&self, literal_query: &str) -> Vec<(String, String)> {
        let mut params = vec![(self.config.query_param.clone(), literal_query.to_string())];

        if let (Some(param), Some(key)) = (&self.config.api_key_param, &self.config.api_key) {
            params.push((param.clone(), key.clone()));
        }
        for (name, value) in &self.config.extra_params {
            params.push((name.clone(), value.clone()));
        }
        if let Some(code) = self.options.language_code() {
            params.push(("lr".to_string(), format!("lang_{}", code)));
        }
        if let Some(code) = self.options.country_code() {
            params.push(("cr".to_string(), format!("country{}", code)));
        }
        if let Some(code) = self.options.search_region_code() {
            params.push(("gl".to_string(), code.to_lowercase()));
        }
        let safe = if self.options.suppress_adult_content { "active" } else { "off" };
        params.push(("safe".to_string(), safe.to_string()));
        let filter = if self.options.suppress_similar_hits { "1" } else { "0" };
        params.push(("filter".to_string(), filter.to_string()));

        params
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn configure(&mut self, options: &SearchOptions) -> Result<(), BackendError> {
        options.validate()?;
        self.options = options.clone();
        Ok(())
    }

    async fn hit_count(&self, request: &HitCountRequest<'_>) -> Result<HitCount, BackendError> {
        let literal_query = format_query(request.terms, &self.options, request.site);

        self.rate_limiter.until_ready().await;

        tracing::debug!(
            backend = %self.config.name,
            query = %literal_query,
            "Submitting hit count query"
        );

        let response = self
            .http_client
            .get(&self.config.endpoint)
            .query(&self.request_params(&literal_query))
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(BackendError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::Api(status.as_u16(), error_text));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        let count = extract_count(&body, &self.config.count_pointer)?;

        tracing::debug!(
            backend = %self.config.name,
            query = %literal_query,
            count,
            "Received hit count"
        );

        Ok(HitCount {
            count,
            literal_query,
        })
    }
}

/// Read a non-negative hit count at `pointer`
pub fn extract_count(body: &serde_json::Value, pointer: &str) -> Result<u64, BackendError> {
    let value = body
        .pointer(pointer)
        .ok_or_else(|| BackendError::Parse(format!("No hit count at {}", pointer)))?;

    if let Some(count) = value.as_u64() {
        return Ok(count);
    }
    if let Some(text) = value.as_str() {
        return text
            .trim()
            .replace(',', "")
            .parse::<u64>()
            .map_err(|_| BackendError::Parse(format!("Hit count '{}' is not a number", text)));
    }
    match value.as_f64() {
        Some(count) if count >= 0.0 && count.is_finite() => Ok(count.floor() as u64),
        _ => Err(BackendError::Parse(format!("Invalid hit count {} at {}", value, pointer))),
    }
}
