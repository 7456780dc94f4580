//! Immutable per-run analysis context
//!
//! Built once (from the TOML file or directly in code) and passed by
//! reference to the planner, collector, combiner and scorer.

use crate::backends::SearchOptions;
use crate::collector::RetryPolicy;
use crate::models::{RequiredFilters, ScoringFunction, SiteRestriction, TermSet, WeightScaling};
use crate::post_normalizer::PostNormalization;
use crate::scorer::ZeroDenominator;
use serde::Serialize;

/// Everything one analysis run needs apart from its backends
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSettings {
    pub scoring_function: ScoringFunction,
    /// Primary axis (rows)
    pub primary: TermSet,
    /// Secondary axis (columns), cross-tabulation only
    pub secondary: Option<TermSet>,
    pub filters: RequiredFilters,
    /// Empty means a single whole-network search
    pub sites: Vec<SiteRestriction>,
    pub weight_scaling: WeightScaling,
    pub normalize_across_backends: bool,
    pub normalize_across_sites: bool,
    pub post_normalization: Option<PostNormalization>,
    pub zero_denominator: ZeroDenominator,
    pub search_options: SearchOptions,
    pub retry: RetryPolicy,
}

impl AnalysisSettings {
    /// Settings with no filters, no site restriction and no normalization
    pub fn new(
        scoring_function: ScoringFunction,
        primary: TermSet,
        secondary: Option<TermSet>,
    ) -> Self {
        Self {
            scoring_function,
            primary,
            secondary,
            filters: RequiredFilters::default(),
            sites: Vec::new(),
            weight_scaling: WeightScaling::default(),
            normalize_across_backends: false,
            normalize_across_sites: false,
            post_normalization: None,
            zero_denominator: ZeroDenominator::default(),
            search_options: SearchOptions::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Configured sites, or the whole network when none are configured
    pub fn effective_sites(&self) -> Vec<SiteRestriction> {
        if self.sites.is_empty() {
            vec![SiteRestriction::whole_network()]
        } else {
            self.sites.clone()
        }
    }

    /// Secondary terms only when the scoring function cross-tabulates
    pub fn active_secondary(&self) -> Option<&TermSet> {
        if self.scoring_function.is_cross_tabulation() {
            self.secondary.as_ref()
        } else {
            None
        }
    }

    /// Column labels of the score matrix
    pub fn column_labels(&self) -> Vec<String> {
        match self.active_secondary() {
            Some(secondary) => secondary.labels(),
            None => self.primary.labels(),
        }
    }
}
