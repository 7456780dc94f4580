//! Normalizer/combiner
//!
//! Collapses the backend and site dimensions of the raw tables:
//!
//! ```text
//! combined[cell] = Σ_backend Σ_site raw[backend][site][cell]
//!                  × backend_multiplier[backend] × site_factor[site]
//! ```
//!
//! A multiplier is `min_nonzero_total / total`, or 0 when the total is 0,
//! so the quietest responding backend (or site) defines the reference
//! scale. The site factor is the site multiplier times the effective site
//! weight; weights always apply.

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{CountKey, Matrix, RawCountSet, RawCounts};
use crate::settings::AnalysisSettings;
use serde::Serialize;

/// Combined tables of one kind of sum
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CombinedTables {
    pub primary: Option<Vec<f64>>,
    pub secondary: Option<Vec<f64>>,
    pub joint: Option<Matrix>,
}

/// Normalized and weighted counts plus the factors behind them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedCounts {
    /// Used for scoring
    pub weighted: CombinedTables,
    /// Plain sums over backends and sites, no normalization or weighting
    pub plain: CombinedTables,
    pub backend_multipliers: Vec<f64>,
    pub site_multipliers: Vec<f64>,
    /// Site multiplier × effective weight
    pub site_factors: Vec<f64>,
}

/// Relative multipliers from per-unit totals
pub fn relative_multipliers(totals: &[u64]) -> Vec<f64> {
    let min_total = totals.iter().copied().filter(|t| *t > 0).min();
    totals
        .iter()
        .map(|&total| match min_total {
            Some(min) if total > 0 => min as f64 / total as f64,
            _ => 0.0,
        })
        .collect()
}

/// Combine the raw tables according to `settings`
pub fn combine(raw: &RawCountSet, settings: &AnalysisSettings) -> AnalysisResult<CombinedCounts> {
    let first = raw
        .tables()
        .next()
        .ok_or_else(|| AnalysisError::Scoring("No hit counts were collected".to_string()))?;
    let backends = first.backends();
    let sites = settings.effective_sites();

    if raw.tables().any(|t| t.backends() != backends || t.sites() != sites.len()) {
        return Err(AnalysisError::Scoring(format!(
            "Hit count tables do not match {} backend(s) and {} site(s)",
            backends,
            sites.len()
        )));
    }

    let backend_multipliers = if settings.normalize_across_backends {
        let totals: Vec<u64> = (0..backends)
            .map(|b| raw.tables().fold(0, |total: u64, t| total.saturating_add(t.backend_total(b))))
            .collect();
        relative_multipliers(&totals)
    } else {
        vec![1.0; backends]
    };

    let site_multipliers = if settings.normalize_across_sites {
        let totals: Vec<u64> = (0..sites.len())
            .map(|s| raw.tables().fold(0, |total: u64, t| total.saturating_add(t.site_total(s))))
            .collect();
        relative_multipliers(&totals)
    } else {
        vec![1.0; sites.len()]
    };

    let weights = settings.weight_scaling.effective_weights(&sites);
    let site_factors: Vec<f64> = site_multipliers
        .iter()
        .zip(&weights)
        .map(|(m, w)| m * w)
        .collect();

    tracing::debug!(
        backend_multipliers = ?backend_multipliers,
        site_factors = ?site_factors,
        "Combining hit counts"
    );

    let ones_b = vec![1.0; backends];
    let ones_s = vec![1.0; sites.len()];

    let weighted = CombinedTables {
        primary: raw
            .primary
            .as_ref()
            .map(|t| collapse(t, &backend_multipliers, &site_factors).column_vector()),
        secondary: raw
            .secondary
            .as_ref()
            .map(|t| collapse(t, &backend_multipliers, &site_factors).column_vector()),
        joint: raw
            .joint
            .as_ref()
            .map(|t| collapse(t, &backend_multipliers, &site_factors)),
    };
    let plain = CombinedTables {
        primary: raw
            .primary
            .as_ref()
            .map(|t| collapse(t, &ones_b, &ones_s).column_vector()),
        secondary: raw
            .secondary
            .as_ref()
            .map(|t| collapse(t, &ones_b, &ones_s).column_vector()),
        joint: raw.joint.as_ref().map(|t| collapse(t, &ones_b, &ones_s)),
    };

    Ok(CombinedCounts {
        weighted,
        plain,
        backend_multipliers,
        site_multipliers,
        site_factors,
    })
}

fn collapse(table: &RawCounts, backend_factors: &[f64], site_factors: &[f64]) -> Matrix {
    let mut combined = Matrix::zeros(table.rows(), table.cols());
    for row in 0..table.rows() {
        for col in 0..table.cols() {
            let mut sum = 0.0;
            for (backend, bf) in backend_factors.iter().enumerate() {
                for (site, sf) in site_factors.iter().enumerate() {
                    let count = table.get(CountKey {
                        backend,
                        site,
                        row,
                        col,
                    });
                    sum += count as f64 * bf * sf;
                }
            }
            combined.set(row, col, sum);
        }
    }
    combined
}
