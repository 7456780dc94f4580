//! Hit-count collector
//!
//! Submits every planned query to every backend for every site, strictly
//! one at a time in backend → site → query order, and fills the raw count
//! tables. Cancellation is checked before each submission.

use crate::backends::{BackendError, HitCountRequest, SearchBackend};
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{CountKey, CountKind, RawCountSet, RawCounts, SiteRestriction};
use crate::planner::{PlannedQuery, QueryGroup, QueryPlan};
use crate::progress::ProgressSink;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Per-query retry budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per query, including the first
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 4000,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1` (exponential, capped)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `operation` until it succeeds, fails permanently or the attempt
    /// budget is spent. Errors carry the number of attempts made.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T, (u32, BackendError)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let max_attempts = self.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        tracing::debug!(operation = operation_name, attempt, "Succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Request failed"
                    );
                    return Err((attempt, err));
                }
            }
        }
    }
}

/// Audit entry for one submitted query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRecord {
    pub kind: CountKind,
    pub backend: String,
    /// `None` for whole-network searches
    pub site: Option<String>,
    pub row: usize,
    pub col: usize,
    pub literal_query: String,
    pub count: u64,
}

/// Raw tables plus the literal-query audit trail
#[derive(Debug, Clone, Default)]
pub struct CollectedCounts {
    pub counts: RawCountSet,
    pub queries: Vec<QueryRecord>,
}

/// Sequential hit-count collector for one run
pub struct HitCountCollector<'a> {
    backends: &'a [Box<dyn SearchBackend>],
    sites: &'a [SiteRestriction],
    retry: &'a RetryPolicy,
    progress: &'a dyn ProgressSink,
}

impl<'a> HitCountCollector<'a> {
    pub fn new(
        backends: &'a [Box<dyn SearchBackend>],
        sites: &'a [SiteRestriction],
        retry: &'a RetryPolicy,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            backends,
            sites,
            retry,
            progress,
        }
    }

    /// Collect every count table of `plan`
    pub async fn collect(&self, plan: &QueryPlan) -> AnalysisResult<CollectedCounts> {
        let mut collected = CollectedCounts::default();

        for group in &plan.groups {
            let table = self.collect_group(group, &mut collected.queries).await?;
            *collected.counts.get_mut(group.kind) = Some(table);
        }

        Ok(collected)
    }

    async fn collect_group(
        &self,
        group: &QueryGroup,
        audit: &mut Vec<QueryRecord>,
    ) -> AnalysisResult<RawCounts> {
        let total = group.queries.len() * self.backends.len() * self.sites.len();
        self.progress
            .start_sub_task(total, &format!("Collecting {} hit counts", group.kind));

        tracing::info!(
            kind = %group.kind,
            queries = group.queries.len(),
            backends = self.backends.len(),
            sites = self.sites.len(),
            "Collecting hit counts"
        );

        let mut table = RawCounts::new(self.backends.len(), self.sites.len(), group.rows, group.cols);

        for (backend_index, backend) in self.backends.iter().enumerate() {
            for (site_index, site) in self.sites.iter().enumerate() {
                for query in &group.queries {
                    if self.progress.is_cancelled() {
                        tracing::info!(kind = %group.kind, "Collection cancelled");
                        return Err(AnalysisError::Cancelled);
                    }

                    let count = self
                        .submit(backend.as_ref(), site, group.kind, query, audit)
                        .await?;

                    let key = CountKey {
                        backend: backend_index,
                        site: site_index,
                        row: query.row,
                        col: query.col,
                    };
                    table.set(key, count);
                    if query.mirrored {
                        table.set(
                            CountKey {
                                row: query.col,
                                col: query.row,
                                ..key
                            },
                            count,
                        );
                    }

                    self.progress.advance();
                }
            }
        }

        Ok(table)
    }

    /// One query with retries
    async fn submit(
        &self,
        backend: &dyn SearchBackend,
        site: &SiteRestriction,
        kind: CountKind,
        query: &PlannedQuery,
        audit: &mut Vec<QueryRecord>,
    ) -> AnalysisResult<u64> {
        let request = HitCountRequest {
            terms: &query.terms,
            site: site.domain.as_deref(),
        };
        let operation = format!("{} hit count ({}, {})", kind, backend.name(), site.display_name());

        let hit = self
            .retry
            .run(&operation, || backend.hit_count(&request))
            .await
            .map_err(|(attempts, source)| AnalysisError::Retrieval {
                backend: backend.name().to_string(),
                site: site.display_name().to_string(),
                kind,
                query: query.terms.join(" "),
                attempts,
                source,
            })?;

        tracing::debug!(
            backend = %backend.name(),
            site = %site.display_name(),
            query = %hit.literal_query,
            count = hit.count,
            "Hit count collected"
        );

        audit.push(QueryRecord {
            kind,
            backend: backend.name().to_string(),
            site: site.domain.clone(),
            row: query.row,
            col: query.col,
            literal_query: hit.literal_query,
            count: hit.count,
        });

        Ok(hit.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{HitCount, SearchOptions};
    use crate::models::{ScoringFunction, TermSet};
    use crate::planner::plan_queries;
    use crate::progress::LoggingProgress;
    use crate::settings::AnalysisSettings;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    /// Answers with the number of terms, failing the first `failures` calls
    struct CountingBackend {
        calls: Mutex<Vec<(Option<String>, Vec<String>)>>,
        failures: AtomicU32,
        error: fn() -> BackendError,
    }

    impl CountingBackend {
        fn new(failures: u32, error: fn() -> BackendError) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failures: AtomicU32::new(failures),
                error,
            }
        }
    }

    #[async_trait]
    impl SearchBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        fn configure(&mut self, _options: &SearchOptions) -> Result<(), BackendError> {
            Ok(())
        }

        async fn hit_count(&self, request: &HitCountRequest<'_>) -> Result<HitCount, BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push((request.site.map(str::to_string), request.terms.to_vec()));
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err((self.error)());
            }
            let count = 10 * self.calls.lock().unwrap().len() as u64;
            Ok(HitCount {
                count,
                literal_query: request.terms.join(" "),
            })
        }
    }

    fn no_backoff() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    fn plan() -> QueryPlan {
        let primary = TermSet::from_lines(vec!["jazz", "blues", "rock"]).unwrap();
        let settings = AnalysisSettings::new(ScoringFunction::Cooc1, primary, None);
        plan_queries(&settings, 1).unwrap()
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(250));
        assert_eq!(policy.backoff(2), Duration::from_millis(500));
        assert_eq!(policy.backoff(10), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_collect_mirrors_joint_counts() {
        let backends: Vec<Box<dyn SearchBackend>> =
            vec![Box::new(CountingBackend::new(0, || BackendError::RateLimited))];
        let sites = vec![SiteRestriction::whole_network()];
        let retry = no_backoff();
        let progress = LoggingProgress::new(CancellationToken::new());

        let collected = HitCountCollector::new(&backends, &sites, &retry, &progress)
            .collect(&plan())
            .await
            .unwrap();

        let joint = collected.counts.joint.unwrap();
        let at = |row, col| {
            joint.get(CountKey {
                backend: 0,
                site: 0,
                row,
                col,
            })
        };
        assert_eq!(at(1, 0), 10);
        assert_eq!(at(0, 1), 10);
        assert_eq!(at(2, 1), 30);
        assert_eq!(at(1, 2), 30);
        assert_eq!(at(0, 0), 0);
        assert_eq!(collected.queries.len(), 3);
        assert_eq!(collected.queries[0].literal_query, "blues jazz");
    }

    #[tokio::test]
    async fn test_site_passed_to_backend() {
        let backend = CountingBackend::new(0, || BackendError::RateLimited);
        let backends: Vec<Box<dyn SearchBackend>> = vec![Box::new(backend)];
        let sites = vec![
            SiteRestriction::whole_network(),
            SiteRestriction::new(Some("allmusic.com"), 2.0).unwrap(),
        ];
        let retry = no_backoff();
        let progress = LoggingProgress::new(CancellationToken::new());

        let collected = HitCountCollector::new(&backends, &sites, &retry, &progress)
            .collect(&plan())
            .await
            .unwrap();

        let sites: Vec<Option<String>> = collected.queries.iter().map(|q| q.site.clone()).collect();
        assert!(sites[..3].iter().all(Option::is_none));
        assert_eq!(sites[3], Some("allmusic.com".to_string()));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let backends: Vec<Box<dyn SearchBackend>> =
            vec![Box::new(CountingBackend::new(2, || BackendError::Network("reset".into())))];
        let sites = vec![SiteRestriction::whole_network()];
        let retry = no_backoff();
        let progress = LoggingProgress::new(CancellationToken::new());

        let collected = HitCountCollector::new(&backends, &sites, &retry, &progress)
            .collect(&plan())
            .await
            .unwrap();
        assert_eq!(collected.queries.len(), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_is_retrieval_error() {
        let backends: Vec<Box<dyn SearchBackend>> =
            vec![Box::new(CountingBackend::new(5, || BackendError::Network("reset".into())))];
        let sites = vec![SiteRestriction::whole_network()];
        let retry = no_backoff();
        let progress = LoggingProgress::new(CancellationToken::new());

        let err = HitCountCollector::new(&backends, &sites, &retry, &progress)
            .collect(&plan())
            .await
            .unwrap_err();

        match err {
            AnalysisError::Retrieval {
                backend,
                attempts,
                kind,
                ..
            } => {
                assert_eq!(backend, "counting");
                assert_eq!(attempts, 3);
                assert_eq!(kind, CountKind::Joint);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_immediately() {
        let backend = CountingBackend::new(5, || BackendError::Api(403, "forbidden".into()));
        let backends: Vec<Box<dyn SearchBackend>> = vec![Box::new(backend)];
        let sites = vec![SiteRestriction::whole_network()];
        let retry = no_backoff();
        let progress = LoggingProgress::new(CancellationToken::new());

        let err = HitCountCollector::new(&backends, &sites, &retry, &progress)
            .collect(&plan())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Retrieval { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_query() {
        let backends: Vec<Box<dyn SearchBackend>> =
            vec![Box::new(CountingBackend::new(0, || BackendError::RateLimited))];
        let sites = vec![SiteRestriction::whole_network()];
        let retry = no_backoff();
        let token = CancellationToken::new();
        token.cancel();
        let progress = LoggingProgress::new(token);

        let err = HitCountCollector::new(&backends, &sites, &retry, &progress)
            .collect(&plan())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
