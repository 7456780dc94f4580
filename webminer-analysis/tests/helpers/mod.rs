//! Test Helper Utilities
//!
//! Shared utilities for testing webminer-analysis

#![allow(dead_code)]

pub mod mock_backend;
pub mod progress;

pub use mock_backend::{Call, CallLog, MockBackend, MockTagSource};
pub use progress::RecordingProgress;

use webminer_analysis::collector::RetryPolicy;
use webminer_analysis::models::{ScoringFunction, TermSet};
use webminer_analysis::AnalysisSettings;

pub fn terms(values: &[&str]) -> TermSet {
    TermSet::from_lines(values.iter().copied()).unwrap()
}

/// Settings with retries that do not sleep
pub fn settings(
    function: ScoringFunction,
    primary: &[&str],
    secondary: Option<&[&str]>,
) -> AnalysisSettings {
    let mut settings = AnalysisSettings::new(function, terms(primary), secondary.map(terms));
    settings.retry = RetryPolicy {
        max_attempts: 3,
        initial_backoff_ms: 0,
        max_backoff_ms: 0,
    };
    settings
}

pub fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("defined score");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
