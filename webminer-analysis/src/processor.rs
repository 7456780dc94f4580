//! Analysis run orchestration
//!
//! One [`AnalysisProcessor`] performs exactly one run and is consumed by
//! it: validate, configure backends, plan, collect, combine, score,
//! post-normalize, then optionally fuse tag rankings.

use crate::backends::{SearchBackend, TagSource};
use crate::collector::{HitCountCollector, QueryRecord};
use crate::combiner::{combine, CombinedCounts};
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::ScoreMatrix;
use crate::planner::{plan_queries, validate, QueryPlan};
use crate::post_normalizer::normalize;
use crate::progress::ProgressSink;
use crate::scorer::score;
use crate::settings::AnalysisSettings;
use crate::tag_rank::{fetch_rank_table, fuse, RankTable};

/// Tag-ranking results of a cross-tabulation run
#[derive(Debug, Clone)]
pub struct TagFusion {
    pub source: String,
    pub ranks: RankTable,
    pub tag_scores: ScoreMatrix,
    pub fused: ScoreMatrix,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub settings: AnalysisSettings,
    pub backend_names: Vec<String>,
    pub plan: QueryPlan,
    pub combined: CombinedCounts,
    /// Scores before post-normalization
    pub unnormalized_scores: ScoreMatrix,
    /// Post-normalized web scores
    pub scores: ScoreMatrix,
    pub tag_fusion: Option<TagFusion>,
    pub queries: Vec<QueryRecord>,
}

impl AnalysisOutcome {
    /// Fused scores when tag ranking ran, web scores otherwise
    pub fn final_scores(&self) -> &ScoreMatrix {
        self.tag_fusion
            .as_ref()
            .map(|t| &t.fused)
            .unwrap_or(&self.scores)
    }
}

/// Single-use analysis run
pub struct AnalysisProcessor {
    settings: AnalysisSettings,
    backends: Vec<Box<dyn SearchBackend>>,
    tag_source: Option<Box<dyn TagSource>>,
}

impl AnalysisProcessor {
    pub fn new(settings: AnalysisSettings, backends: Vec<Box<dyn SearchBackend>>) -> Self {
        Self {
            settings,
            backends,
            tag_source: None,
        }
    }

    pub fn with_tag_source(mut self, tag_source: Box<dyn TagSource>) -> Self {
        self.tag_source = Some(tag_source);
        self
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Query plan without contacting any backend
    pub fn plan(&self) -> AnalysisResult<QueryPlan> {
        plan_queries(&self.settings, self.backends.len())
    }

    /// Total backend submissions the run will make
    pub fn submission_count(&self) -> AnalysisResult<usize> {
        Ok(self
            .plan()?
            .total_submissions(self.backends.len(), self.settings.effective_sites().len()))
    }

    pub async fn run(mut self, progress: &dyn ProgressSink) -> AnalysisResult<AnalysisOutcome> {
        validate(&self.settings, self.backends.len())?;

        for backend in self.backends.iter_mut() {
            backend.configure(&self.settings.search_options)?;
        }

        let plan = plan_queries(&self.settings, self.backends.len())?;
        let sites = self.settings.effective_sites();
        let backend_names: Vec<String> = self.backends.iter().map(|b| b.name().to_string()).collect();

        tracing::info!(
            scoring_function = %self.settings.scoring_function,
            mode = %self.settings.scoring_function.mode(),
            backends = ?backend_names,
            sites = sites.len(),
            submissions = plan.total_submissions(self.backends.len(), sites.len()),
            "Starting analysis"
        );

        let collected = HitCountCollector::new(&self.backends, &sites, &self.settings.retry, progress)
            .collect(&plan)
            .await?;

        let ranks = self.fetch_tag_ranks(progress).await?;

        progress.start_sub_task(1, "Scoring and report assembly");

        let combined = combine(&collected.counts, &self.settings)?;
        let unnormalized_scores = score(
            self.settings.scoring_function,
            &combined.weighted,
            self.settings.zero_denominator,
        )?;

        let mut scores = unnormalized_scores.clone();
        if let Some(normalization) = &self.settings.post_normalization {
            normalize(&mut scores, normalization);
        }

        let tag_fusion = ranks.map(|(source, ranks)| {
            let tag_scores = ranks.scores();
            let fused = fuse(&scores, &tag_scores);
            TagFusion {
                source,
                ranks,
                tag_scores,
                fused,
            }
        });

        if progress.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        progress.advance();
        progress.mark_complete();

        tracing::info!(
            rows = scores.rows(),
            cols = scores.cols(),
            queries = collected.queries.len(),
            "Analysis finished"
        );

        Ok(AnalysisOutcome {
            settings: self.settings,
            backend_names,
            plan,
            combined,
            unnormalized_scores,
            scores,
            tag_fusion,
            queries: collected.queries,
        })
    }

    async fn fetch_tag_ranks(
        &self,
        progress: &dyn ProgressSink,
    ) -> AnalysisResult<Option<(String, RankTable)>> {
        let Some(source) = self.tag_source.as_deref() else {
            return Ok(None);
        };
        let Some(secondary) = self.settings.active_secondary() else {
            tracing::warn!(
                source = %source.name(),
                "Tag ranking applies to cross-tabulation only, skipping"
            );
            return Ok(None);
        };

        let ranks = fetch_rank_table(
            source,
            &self.settings.primary,
            secondary,
            &self.settings.retry,
            progress,
        )
        .await?;

        Ok(Some((source.name().to_string(), ranks)))
    }
}
