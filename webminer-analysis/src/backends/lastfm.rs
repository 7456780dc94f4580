//! Last.fm top-tags client
//!
//! Supplies ranked artist tags for the tag-rank second opinion in
//! cross-tabulation runs.

use super::{BackendError, TagSource};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

const LASTFM_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";
const USER_AGENT: &str = concat!("webminer/", env!("CARGO_PKG_VERSION"));

/// Last.fm allows 5 requests per second per key
const REQUESTS_PER_SECOND: u32 = 5;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TopTagsResponse {
    Tags { toptags: TopTags },
    Error { error: u32, message: String },
}

#[derive(Debug, Deserialize)]
struct TopTags {
    #[serde(default)]
    tag: Vec<LastFmTag>,
}

#[derive(Debug, Deserialize)]
struct LastFmTag {
    name: String,
}

/// Last.fm `artist.gettoptags` client
pub struct LastFmTagSource {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl LastFmTagSource {
    pub fn new(api_key: String) -> Result<Self, BackendError> {
        if api_key.trim().is_empty() {
            return Err(BackendError::MissingApiKey("Last.fm".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let per_second = NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            api_key,
            base_url: LASTFM_BASE_URL.to_string(),
            http_client,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    /// Point the client at another API root (mirrors, local fixtures)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TagSource for LastFmTagSource {
    fn name(&self) -> &str {
        "Last.fm"
    }

    async fn top_tags(&self, term: &str) -> Result<Vec<String>, BackendError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(artist = %term, "Querying Last.fm top tags");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("method", "artist.gettoptags"),
                ("artist", term),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(BackendError::RateLimited);
        }
        if !status.is_success() && status.as_u16() != 400 {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::Api(status.as_u16(), error_text));
        }

        let body: TopTagsResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        parse_tags(body, term)
    }
}

fn parse_tags(body: TopTagsResponse, term: &str) -> Result<Vec<String>, BackendError> {
    match body {
        TopTagsResponse::Tags { toptags } => {
            let tags: Vec<String> = toptags.tag.into_iter().map(|t| t.name).collect();
            tracing::debug!(artist = %term, tags = tags.len(), "Retrieved Last.fm tags");
            Ok(tags)
        }
        // Error 6: artist not found, which simply means no tags
        TopTagsResponse::Error { error: 6, .. } => {
            tracing::warn!(artist = %term, "Artist not found on Last.fm");
            Ok(Vec::new())
        }
        TopTagsResponse::Error { error: 29, .. } => Err(BackendError::RateLimited),
        TopTagsResponse::Error { error, message } => Err(BackendError::Api(error as u16, message)),
    }
}
