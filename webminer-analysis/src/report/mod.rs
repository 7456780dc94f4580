//! Report assembly
//!
//! [`AnalysisReport`] is the serializable record of one run: labels, final
//! scores, every intermediate table worth inspecting and the literal
//! queries submitted. Renderers live in [`text`] and [`export`].

pub mod export;
pub mod text;

pub use export::{write_reports, OutputFormat};

use crate::backends::SearchOptions;
use crate::collector::QueryRecord;
use crate::models::{AnalysisMode, Matrix, ScoreMatrix, ScoringFunction, WeightScaling};
use crate::post_normalizer::PostNormalization;
use crate::processor::{AnalysisOutcome, TagFusion};
use crate::scorer::ZeroDenominator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A labelled 2-D table of optional values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedTable {
    pub name: String,
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl NamedTable {
    pub fn from_scores(
        name: impl Into<String>,
        row_labels: &[String],
        column_labels: &[String],
        scores: &ScoreMatrix,
    ) -> Self {
        Self {
            name: name.into(),
            row_labels: row_labels.to_vec(),
            column_labels: column_labels.to_vec(),
            values: (0..scores.rows()).map(|r| scores.row(r).to_vec()).collect(),
        }
    }

    fn from_matrix(
        name: impl Into<String>,
        row_labels: &[String],
        column_labels: &[String],
        matrix: &Matrix,
    ) -> Self {
        Self {
            name: name.into(),
            row_labels: row_labels.to_vec(),
            column_labels: column_labels.to_vec(),
            values: (0..matrix.rows())
                .map(|r| matrix.row(r).iter().copied().map(Some).collect())
                .collect(),
        }
    }

    fn from_vector(name: impl Into<String>, labels: &[String], values: &[f64]) -> Self {
        Self {
            name: name.into(),
            row_labels: labels.to_vec(),
            column_labels: vec!["Hits".to_string()],
            values: values.iter().map(|v| vec![Some(*v)]).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendSummary {
    pub name: String,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSummary {
    pub site: String,
    pub weight: f64,
    pub multiplier: f64,
    /// Multiplier × effective weight
    pub factor: f64,
}

/// Settings that shaped the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsSummary {
    pub normalize_across_backends: bool,
    pub normalize_across_sites: bool,
    pub weight_scaling: WeightScaling,
    pub post_normalization: Option<PostNormalization>,
    pub zero_denominator: ZeroDenominator,
    pub required_filters: Vec<String>,
    pub search_options: SearchOptions,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagSummary {
    pub source: String,
    /// 1-based rank of each column term among each row term's tags
    pub ranks: Vec<Vec<Option<usize>>>,
}

/// Full record of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub scoring_function: ScoringFunction,
    pub mode: AnalysisMode,
    pub formula: String,
    pub settings: SettingsSummary,
    pub backends: Vec<BackendSummary>,
    pub sites: Vec<SiteSummary>,
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    /// Final scores (fused when tag ranking ran)
    pub scores: NamedTable,
    /// Feature table for the export formats: web scores, followed by tag
    /// scores when tag ranking ran
    pub features: NamedTable,
    /// Further tables: web scores, combined counts, tag scores
    pub tables: Vec<NamedTable>,
    pub tag_ranking: Option<TagSummary>,
    pub queries: Vec<QueryRecord>,
}

impl AnalysisReport {
    pub fn from_outcome(outcome: &AnalysisOutcome) -> Self {
        let settings = &outcome.settings;
        let row_labels = settings.primary.labels();
        let column_labels = settings.column_labels();
        let combined = &outcome.combined;

        let mut tables = Vec::new();

        if outcome.tag_fusion.is_some() || settings.post_normalization.is_some() {
            tables.push(NamedTable::from_scores(
                "Web search scores",
                &row_labels,
                &column_labels,
                &outcome.scores,
            ));
        }
        if settings.post_normalization.is_some() {
            tables.push(NamedTable::from_scores(
                "Web search scores before post-normalization",
                &row_labels,
                &column_labels,
                &outcome.unnormalized_scores,
            ));
        }
        if let Some(fusion) = &outcome.tag_fusion {
            tables.push(NamedTable::from_scores(
                format!("{} tag scores", fusion.source),
                &row_labels,
                &column_labels,
                &fusion.tag_scores,
            ));
        }

        for (suffix, counts) in [
            ("normalized and weighted", &combined.weighted),
            ("without normalization or weighting", &combined.plain),
        ] {
            if let Some(joint) = &counts.joint {
                tables.push(NamedTable::from_matrix(
                    format!("Combined joint hit counts ({})", suffix),
                    &row_labels,
                    &column_labels,
                    joint,
                ));
            }
            if let Some(primary) = &counts.primary {
                tables.push(NamedTable::from_vector(
                    format!("Combined primary hit counts ({})", suffix),
                    &row_labels,
                    primary,
                ));
            }
            if let (Some(secondary), Some(terms)) = (&counts.secondary, settings.active_secondary()) {
                tables.push(NamedTable::from_vector(
                    format!("Combined secondary hit counts ({})", suffix),
                    &terms.labels(),
                    secondary,
                ));
            }
        }

        let sites = settings.effective_sites();
        let sites = sites
            .iter()
            .enumerate()
            .map(|(i, site)| SiteSummary {
                site: site.display_name().to_string(),
                weight: site.weight,
                multiplier: combined.site_multipliers.get(i).copied().unwrap_or(1.0),
                factor: combined.site_factors.get(i).copied().unwrap_or(1.0),
            })
            .collect();

        let backends = outcome
            .backend_names
            .iter()
            .zip(&combined.backend_multipliers)
            .map(|(name, multiplier)| BackendSummary {
                name: name.clone(),
                multiplier: *multiplier,
            })
            .collect();

        let required_filters = settings
            .filters
            .basic
            .iter()
            .cloned()
            .chain(settings.filters.patterns.iter().map(|p| p.source().to_string()))
            .collect();

        let features = match &outcome.tag_fusion {
            Some(fusion) => feature_table(&row_labels, &column_labels, &outcome.scores, fusion),
            None => NamedTable::from_scores("Features", &row_labels, &column_labels, &outcome.scores),
        };

        let tag_ranking = outcome.tag_fusion.as_ref().map(|fusion| TagSummary {
            source: fusion.source.clone(),
            ranks: (0..fusion.ranks.rows())
                .map(|r| (0..column_labels.len()).map(|c| fusion.ranks.rank(r, c)).collect())
                .collect(),
        });

        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            scoring_function: settings.scoring_function,
            mode: settings.scoring_function.mode(),
            formula: settings.scoring_function.formula().to_string(),
            settings: SettingsSummary {
                normalize_across_backends: settings.normalize_across_backends,
                normalize_across_sites: settings.normalize_across_sites,
                weight_scaling: settings.weight_scaling,
                post_normalization: settings.post_normalization,
                zero_denominator: settings.zero_denominator,
                required_filters,
                search_options: settings.search_options.clone(),
                max_attempts: settings.retry.max_attempts,
            },
            backends,
            sites,
            scores: NamedTable::from_scores(
                "Scores",
                &row_labels,
                &column_labels,
                outcome.final_scores(),
            ),
            features,
            row_labels,
            column_labels,
            tables,
            tag_ranking,
            queries: outcome.queries.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Web and tag scores side by side, columns suffixed `_WS` and `_<source>`
fn feature_table(
    row_labels: &[String],
    column_labels: &[String],
    web: &ScoreMatrix,
    fusion: &TagFusion,
) -> NamedTable {
    let source: String = fusion.source.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let columns = column_labels
        .iter()
        .map(|l| format!("{}_WS", l))
        .chain(column_labels.iter().map(|l| format!("{}_{}", l, source)))
        .collect();
    let values = (0..web.rows())
        .map(|r| {
            web.row(r)
                .iter()
                .chain(fusion.tag_scores.row(r))
                .copied()
                .collect()
        })
        .collect();
    NamedTable {
        name: "Features".to_string(),
        row_labels: row_labels.to_vec(),
        column_labels: columns,
        values,
    }
}
