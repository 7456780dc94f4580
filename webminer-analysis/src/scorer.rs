//! Scoring functions
//!
//! Pure functions from combined counts to a score matrix. Co-occurrence
//! diagonal cells are undefined. Division by zero follows
//! [`ZeroDenominator`]; NaN and infinities never reach the matrix.

use crate::combiner::CombinedTables;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{Matrix, ScoreMatrix, ScoringFunction};
use serde::{Deserialize, Serialize};

/// What a zero denominator produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZeroDenominator {
    /// The cell scores 0
    #[default]
    Zero,
    /// The cell is undefined
    Undefined,
}

impl ZeroDenominator {
    fn divide(&self, numerator: f64, denominator: f64) -> Option<f64> {
        if denominator == 0.0 {
            return match self {
                ZeroDenominator::Zero => Some(0.0),
                ZeroDenominator::Undefined => None,
            };
        }
        let value = numerator / denominator;
        if value.is_finite() {
            Some(value)
        } else {
            None
        }
    }
}

/// Score every cell of the combined counts with `function`
pub fn score(
    function: ScoringFunction,
    counts: &CombinedTables,
    policy: ZeroDenominator,
) -> AnalysisResult<ScoreMatrix> {
    let joint = counts
        .joint
        .as_ref()
        .ok_or_else(|| missing(function, "C(a,b)"))?;

    let scores = match function {
        ScoringFunction::Cooc1 => cooc1(joint),
        ScoringFunction::Cooc2 => {
            let primary = counts.primary.as_ref().ok_or_else(|| missing(function, "C(a)"))?;
            cooc2(joint, primary, policy)
        }
        ScoringFunction::CrossTab1 => {
            let primary = counts.primary.as_ref().ok_or_else(|| missing(function, "C(a)"))?;
            cells(joint, |a, b| policy.divide(joint.get(a, b), primary[a]))
        }
        ScoringFunction::CrossTab2 => {
            let secondary = counts
                .secondary
                .as_ref()
                .ok_or_else(|| missing(function, "C(b)"))?;
            cells(joint, |a, b| policy.divide(joint.get(a, b), secondary[b]))
        }
        ScoringFunction::CrossTab3 => {
            let column_sums: Vec<f64> = (0..joint.cols())
                .map(|b| (0..joint.rows()).map(|c| joint.get(c, b)).sum())
                .collect();
            cells(joint, |a, b| policy.divide(joint.get(a, b), 1.0 + column_sums[b]))
        }
        ScoringFunction::CrossTab4 => {
            let row_sums: Vec<f64> = (0..joint.rows()).map(|a| joint.row(a).iter().sum()).collect();
            cells(joint, |a, b| policy.divide(joint.get(a, b), 1.0 + row_sums[a]))
        }
    };

    Ok(scores)
}

fn missing(function: ScoringFunction, counts: &str) -> AnalysisError {
    AnalysisError::Scoring(format!("{} requires {} counts, which were not collected", function, counts))
}

fn cells(joint: &Matrix, mut cell: impl FnMut(usize, usize) -> Option<f64>) -> ScoreMatrix {
    let mut scores = ScoreMatrix::new(joint.rows(), joint.cols());
    for a in 0..joint.rows() {
        for b in 0..joint.cols() {
            scores.set(a, b, cell(a, b));
        }
    }
    scores
}

/// Off-diagonal cells only
fn pairwise(joint: &Matrix, mut cell: impl FnMut(usize, usize) -> Option<f64>) -> ScoreMatrix {
    cells(joint, |i, j| if i == j { None } else { cell(i, j) })
}

fn cooc1(joint: &Matrix) -> ScoreMatrix {
    let n = joint.rows();
    pairwise(joint, |i, j| {
        let others = (0..n).filter(|&c| c != i && c != j);
        let from_first: f64 = others.clone().map(|c| joint.get(i, c)).sum();
        let into_second: f64 = others.map(|d| joint.get(d, j)).sum();
        let value = joint.get(i, j) / (1.0 + from_first * into_second);
        value.is_finite().then_some(value)
    })
}

fn cooc2(joint: &Matrix, primary: &[f64], policy: ZeroDenominator) -> ScoreMatrix {
    let max_count = primary.iter().copied().fold(0.0_f64, f64::max);
    pairwise(joint, |i, j| {
        let conditional = policy.divide(joint.get(i, j), primary[j])?;
        let spread = policy.divide((primary[i] - primary[j]).abs(), max_count)?;
        Some(conditional * (1.0 - spread))
    })
}
