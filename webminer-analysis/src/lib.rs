//! webminer-analysis library
//!
//! Measures association strength between musical terms from web search hit
//! counts. The pipeline runs strictly in sequence:
//!
//! planner → collector → combiner → scorer → post-normalizer
//! → (tag-rank fusion) → report
//!
//! [`AnalysisProcessor`] drives one run over an immutable
//! [`AnalysisSettings`].

pub mod backends;
pub mod collector;
pub mod combiner;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod planner;
pub mod post_normalizer;
pub mod processor;
pub mod progress;
pub mod report;
pub mod scorer;
pub mod settings;
pub mod tag_rank;

pub use crate::error::{AnalysisError, AnalysisResult};
pub use crate::processor::{AnalysisOutcome, AnalysisProcessor};
pub use crate::progress::{LoggingProgress, ProgressSink};
pub use crate::settings::AnalysisSettings;
