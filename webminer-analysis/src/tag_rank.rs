//! Tag-ranking second opinion for cross-tabulation runs
//!
//! For each primary term a [`TagSource`] supplies a ranked tag list. A
//! secondary term found at position `r` (1-based, case-insensitive) scores
//! `1/r`, rescaled so every row sums to 1. The fused score averages the web
//! and tag scores and rescales each row to sum to 1 again.

use crate::backends::TagSource;
use crate::collector::RetryPolicy;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{ScoreMatrix, TermSet};
use crate::progress::ProgressSink;
use serde::Serialize;

/// Rank of each secondary term among each primary term's tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankTable {
    ranks: Vec<Vec<Option<usize>>>,
}

impl RankTable {
    /// Build from each primary term's tags, most relevant first
    pub fn from_tags(tags_per_row: &[Vec<String>], secondary: &TermSet) -> Self {
        let ranks = tags_per_row
            .iter()
            .map(|tags| {
                let lowered: Vec<String> = tags.iter().map(|t| t.trim().to_lowercase()).collect();
                secondary
                    .iter()
                    .map(|term| {
                        let wanted = term.canonical().to_lowercase();
                        lowered.iter().position(|t| *t == wanted).map(|p| p + 1)
                    })
                    .collect()
            })
            .collect();
        Self { ranks }
    }

    pub fn rank(&self, row: usize, col: usize) -> Option<usize> {
        self.ranks[row][col]
    }

    pub fn rows(&self) -> usize {
        self.ranks.len()
    }

    /// Per-row (1/rank) / Σ(1/rank); absent tags score 0
    pub fn scores(&self) -> ScoreMatrix {
        let rows = self
            .ranks
            .iter()
            .map(|row| {
                let inverse: Vec<f64> = row
                    .iter()
                    .map(|r| r.map_or(0.0, |rank| 1.0 / rank as f64))
                    .collect();
                let total: f64 = inverse.iter().sum();
                inverse
                    .into_iter()
                    .map(|v| Some(if total > 0.0 { v / total } else { 0.0 }))
                    .collect()
            })
            .collect();
        ScoreMatrix::from_rows(rows)
    }
}

/// Retrieve tags for every primary term
pub async fn fetch_rank_table(
    source: &dyn TagSource,
    primary: &TermSet,
    secondary: &TermSet,
    retry: &RetryPolicy,
    progress: &dyn ProgressSink,
) -> AnalysisResult<RankTable> {
    progress.start_sub_task(primary.len(), &format!("Retrieving {} tag rankings", source.name()));
    tracing::info!(source = %source.name(), terms = primary.len(), "Retrieving tag rankings");

    let mut tags_per_row = Vec::with_capacity(primary.len());
    for term in primary.iter() {
        if progress.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let name = term.canonical();
        let operation = format!("{} tags for {}", source.name(), name);
        let tags = retry
            .run(&operation, || source.top_tags(name))
            .await
            .map_err(|(attempts, err)| AnalysisError::TagRetrieval {
                source_name: source.name().to_string(),
                term: name.to_string(),
                attempts,
                source: err,
            })?;

        tags_per_row.push(tags);
        progress.advance();
    }

    Ok(RankTable::from_tags(&tags_per_row, secondary))
}

/// 0.5 × (web + tag) per cell, each row rescaled to sum to 1.
///
/// Undefined web cells count as 0. A row summing to 0 becomes uniform.
pub fn fuse(web: &ScoreMatrix, tags: &ScoreMatrix) -> ScoreMatrix {
    let cols = web.cols();
    let rows = (0..web.rows())
        .map(|row| {
            let averaged: Vec<f64> = (0..cols)
                .map(|col| {
                    let w = web.get(row, col).unwrap_or(0.0);
                    let t = tags.get(row, col).unwrap_or(0.0);
                    0.5 * (w + t)
                })
                .collect();
            let total: f64 = averaged.iter().sum();
            averaged
                .into_iter()
                .map(|v| Some(if total > 0.0 { v / total } else { 1.0 / cols as f64 }))
                .collect()
        })
        .collect();
    ScoreMatrix::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::BackendError;
    use crate::progress::LoggingProgress;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    fn secondary() -> TermSet {
        TermSet::from_lines(vec!["Classical", "jazz", "rock"]).unwrap()
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_ranks_are_case_insensitive_and_one_based() {
        let table = RankTable::from_tags(
            &[tags(&["classical", "piano", "Jazz"]), tags(&[])],
            &secondary(),
        );
        assert_eq!(table.rank(0, 0), Some(1));
        assert_eq!(table.rank(0, 1), Some(3));
        assert_eq!(table.rank(0, 2), None);
        assert_eq!(table.rank(1, 0), None);
    }

    #[test]
    fn test_tag_scores_rescaled_per_row() {
        let table = RankTable::from_tags(
            &[tags(&["classical", "piano", "jazz"]), tags(&["pop"])],
            &secondary(),
        );
        let scores = table.scores();
        // 1 and 1/3 -> 0.75 and 0.25
        assert!((scores.get(0, 0).unwrap() - 0.75).abs() < 1e-9);
        assert!((scores.get(0, 1).unwrap() - 0.25).abs() < 1e-9);
        assert_eq!(scores.get(0, 2), Some(0.0));
        assert_eq!(scores.row(1), &[Some(0.0), Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_fuse_rows_sum_to_one() {
        let web = ScoreMatrix::from_rows(vec![
            vec![Some(0.8), Some(0.05), None],
            vec![Some(0.0), Some(0.0), Some(0.0)],
        ]);
        let tag = ScoreMatrix::from_rows(vec![
            vec![Some(0.75), Some(0.25), Some(0.0)],
            vec![Some(0.0), Some(0.0), Some(0.0)],
        ]);
        let fused = fuse(&web, &tag);

        let first: f64 = fused.row(0).iter().flatten().sum();
        assert!((first - 1.0).abs() < 1e-9);
        assert_eq!(fused.get(0, 2), Some(0.0));
        let uniform = 1.0 / 3.0;
        assert!(fused.row(1).iter().all(|v| (v.unwrap() - uniform).abs() < 1e-9));
    }

    struct FixedTags;

    #[async_trait]
    impl TagSource for FixedTags {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn top_tags(&self, term: &str) -> Result<Vec<String>, BackendError> {
            match term {
                "beethoven" => Ok(tags(&["classical", "romantic"])),
                "coltrane" => Ok(tags(&["jazz", "saxophone"])),
                _ => Err(BackendError::Api(404, "unknown".into())),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_rank_table() {
        let primary = TermSet::from_lines(vec!["beethoven", "coltrane"]).unwrap();
        let progress = LoggingProgress::new(CancellationToken::new());
        let table = fetch_rank_table(&FixedTags, &primary, &secondary(), &RetryPolicy::default(), &progress)
            .await
            .unwrap();
        assert_eq!(table.rank(0, 0), Some(1));
        assert_eq!(table.rank(1, 1), Some(1));
        assert_eq!(progress.position(), (2, 2));
    }

    #[tokio::test]
    async fn test_fetch_failure_names_term() {
        let primary = TermSet::from_lines(vec!["nobody"]).unwrap();
        let progress = LoggingProgress::new(CancellationToken::new());
        let err = fetch_rank_table(&FixedTags, &primary, &secondary(), &RetryPolicy::default(), &progress)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::TagRetrieval { term, attempts: 1, .. } if term == "nobody"));
    }
}
