//! Optional rescaling of the score matrix, per row or over the whole matrix.
//! Undefined cells are skipped and stay undefined.

use crate::models::ScoreMatrix;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizationScope {
    /// Each row independently
    #[default]
    Row,
    /// All cells together
    Global,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizationRule {
    /// (v - min) / (max - min); 0 when max == min
    #[default]
    MinMax,
    /// v / sum; 0 when the sum is 0
    SumToOne,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostNormalization {
    pub scope: NormalizationScope,
    pub rule: NormalizationRule,
}

/// Rescale `scores` in place
pub fn normalize(scores: &mut ScoreMatrix, normalization: &PostNormalization) {
    match normalization.scope {
        NormalizationScope::Row => {
            for row in 0..scores.rows() {
                rescale(scores.row_mut(row), normalization.rule);
            }
        }
        NormalizationScope::Global => rescale(scores.cells_mut(), normalization.rule),
    }
}

fn rescale(cells: &mut [Option<f64>], rule: NormalizationRule) {
    let defined = || cells.iter().filter_map(|c| *c);
    match rule {
        NormalizationRule::MinMax => {
            let min = defined().fold(f64::INFINITY, f64::min);
            let max = defined().fold(f64::NEG_INFINITY, f64::max);
            let range = max - min;
            for value in cells.iter_mut().flatten() {
                *value = if range > 0.0 { (*value - min) / range } else { 0.0 };
            }
        }
        NormalizationRule::SumToOne => {
            let sum: f64 = defined().sum();
            for value in cells.iter_mut().flatten() {
                *value = if sum != 0.0 { *value / sum } else { 0.0 };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> ScoreMatrix {
        ScoreMatrix::from_rows(vec![
            vec![None, Some(2.0), Some(4.0)],
            vec![Some(1.0), None, Some(3.0)],
            vec![Some(5.0), Some(5.0), None],
        ])
    }

    #[test]
    fn test_row_min_max() {
        let mut scores = matrix();
        normalize(&mut scores, &PostNormalization::default());

        assert_eq!(scores.row(0), &[None, Some(0.0), Some(1.0)]);
        assert_eq!(scores.row(1), &[Some(0.0), None, Some(1.0)]);
        // degenerate row
        assert_eq!(scores.row(2), &[Some(0.0), Some(0.0), None]);
    }

    #[test]
    fn test_global_min_max() {
        let mut scores = matrix();
        normalize(
            &mut scores,
            &PostNormalization {
                scope: NormalizationScope::Global,
                rule: NormalizationRule::MinMax,
            },
        );
        assert_eq!(scores.get(1, 0), Some(0.0));
        assert_eq!(scores.get(2, 0), Some(1.0));
        assert_eq!(scores.get(0, 2), Some(0.75));
        assert_eq!(scores.get(0, 0), None);
    }

    #[test]
    fn test_row_sum_to_one() {
        let mut scores = matrix();
        normalize(
            &mut scores,
            &PostNormalization {
                scope: NormalizationScope::Row,
                rule: NormalizationRule::SumToOne,
            },
        );
        assert_eq!(scores.row(1), &[Some(0.25), None, Some(0.75)]);
        for row in 0..scores.rows() {
            let sum: f64 = scores.row(row).iter().flatten().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_row_values_bounded() {
        let mut scores = ScoreMatrix::from_rows(vec![vec![Some(0.3), Some(17.0), Some(-2.0), Some(0.0)]]);
        normalize(&mut scores, &PostNormalization::default());
        assert!(scores.defined_values().all(|v| (0.0..=1.0).contains(&v)));
    }
}
