//! Data model: terms, filters, sites, scoring selectors and count tables

pub mod counts;
pub mod filter;
pub mod scoring;
pub mod site;
pub mod term;

pub use counts::{CountKey, CountKind, Matrix, RawCountSet, RawCounts, ScoreMatrix};
pub use filter::{FilterTemplate, RequiredFilters, Segment, PRIMARY_SLOT, SECONDARY_SLOT};
pub use scoring::{AnalysisMode, ScoringFunction};
pub use site::{SiteRestriction, WeightScaling};
pub use term::{Term, TermSet};
