//! Error types for webminer-analysis
//!
//! Four categories are surfaced to callers:
//! - configuration errors (raised before any query is submitted)
//! - retrieval failures (a backend or tag source exhausted its retry budget)
//! - cancellation (distinct from failures, see [`AnalysisError::is_cancelled`])
//! - scoring/report errors

use crate::backends::BackendError;
use crate::models::CountKind;
use thiserror::Error;

/// Analysis run error type
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Missing or invalid setting, named by field
    #[error("Invalid configuration for {field}: {message}")]
    Config { field: String, message: String },

    /// A query could not be answered within the retry budget
    #[error(
        "Hit count retrieval failed for {kind} query '{query}' on backend {backend} ({site}) after {attempts} attempt(s): {source}"
    )]
    Retrieval {
        backend: String,
        site: String,
        kind: CountKind,
        query: String,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    /// Tag ranking could not be retrieved within the retry budget
    #[error("Tag retrieval failed for '{term}' from {source_name} after {attempts} attempt(s): {source}")]
    TagRetrieval {
        source_name: String,
        term: String,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    /// The caller requested cancellation between two queries
    #[error("Processing cancelled by user")]
    Cancelled,

    /// Counts required by the scoring function were not collected
    #[error("Scoring error: {0}")]
    Scoring(String),

    /// Backend setup failure (outside of a query)
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Writing a report failed
    #[error("Report output error: {0}")]
    Report(#[from] std::io::Error),

    /// webminer-common error
    #[error(transparent)]
    Common(#[from] webminer_common::Error),
}

impl AnalysisError {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True when the run stopped because the user asked it to
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisError::Cancelled)
    }
}

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;
