//! Query planner
//!
//! Expands the term sets into the exact queries the selected scoring
//! function consumes. Co-occurrence joint counts are queried once per
//! unordered pair and mirrored.

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{AnalysisMode, CountKind, RequiredFilters, ScoringFunction, Term};
use crate::settings::AnalysisSettings;
use serde::Serialize;

/// One query to submit to every backend for every site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedQuery {
    pub row: usize,
    /// Always 0 for self-count queries
    pub col: usize,
    /// Store the result at [col][row] as well (co-occurrence pairs)
    pub mirrored: bool,
    /// Synonym groups followed by basic and pattern-based filters
    pub terms: Vec<String>,
}

/// All queries for one count table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryGroup {
    pub kind: CountKind,
    pub rows: usize,
    pub cols: usize,
    pub queries: Vec<PlannedQuery>,
}

/// The ordered groups for a run (C(a), C(b), C(a,b) as required)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    pub scoring_function: ScoringFunction,
    pub groups: Vec<QueryGroup>,
}

impl QueryPlan {
    pub fn group(&self, kind: CountKind) -> Option<&QueryGroup> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    /// Distinct queries per backend and site
    pub fn queries_per_backend_site(&self) -> usize {
        self.groups.iter().map(|g| g.queries.len()).sum()
    }

    pub fn total_submissions(&self, backends: usize, sites: usize) -> usize {
        self.queries_per_backend_site() * backends * sites
    }
}

/// Fail fast on settings no run could succeed with
pub fn validate(settings: &AnalysisSettings, backend_count: usize) -> AnalysisResult<()> {
    let mode = settings.scoring_function.mode();

    if settings.primary.is_empty() {
        return Err(AnalysisError::config(
            "primary terms",
            "No primary search strings provided",
        ));
    }
    if mode == AnalysisMode::CoOccurrence && settings.primary.len() < 2 {
        return Err(AnalysisError::config(
            "primary terms",
            "Only one primary search string provided; at least two are needed for co-occurrence",
        ));
    }
    if mode == AnalysisMode::CrossTabulation
        && settings.secondary.as_ref().map_or(true, |s| s.is_empty())
    {
        return Err(AnalysisError::config(
            "secondary terms",
            "No secondary search strings provided; these are needed for cross tabulation",
        ));
    }
    if backend_count == 0 {
        return Err(AnalysisError::config(
            "backends",
            "No search backends configured",
        ));
    }
    Ok(())
}

/// Build the query plan for `settings`
pub fn plan_queries(settings: &AnalysisSettings, backend_count: usize) -> AnalysisResult<QueryPlan> {
    validate(settings, backend_count)?;

    let function = settings.scoring_function;
    let primary = &settings.primary;
    let filters = &settings.filters;
    let mut groups = Vec::new();

    if function.requires(CountKind::Primary) {
        let queries = primary
            .iter()
            .enumerate()
            .map(|(row, term)| PlannedQuery {
                row,
                col: 0,
                mirrored: false,
                terms: query_terms(filters, Some(term), None),
            })
            .collect();
        groups.push(QueryGroup {
            kind: CountKind::Primary,
            rows: primary.len(),
            cols: 1,
            queries,
        });
    }

    let secondary = settings.active_secondary();

    if function.requires(CountKind::Secondary) {
        if let Some(secondary) = secondary {
            let queries = secondary
                .iter()
                .enumerate()
                .map(|(row, term)| PlannedQuery {
                    row,
                    col: 0,
                    mirrored: false,
                    terms: query_terms(filters, None, Some(term)),
                })
                .collect();
            groups.push(QueryGroup {
                kind: CountKind::Secondary,
                rows: secondary.len(),
                cols: 1,
                queries,
            });
        }
    }

    let joint = match (function.mode(), secondary) {
        (AnalysisMode::CrossTabulation, Some(secondary)) => {
            let mut queries = Vec::with_capacity(primary.len() * secondary.len());
            for (row, a) in primary.iter().enumerate() {
                for (col, b) in secondary.iter().enumerate() {
                    queries.push(PlannedQuery {
                        row,
                        col,
                        mirrored: false,
                        terms: query_terms(filters, Some(a), Some(b)),
                    });
                }
            }
            QueryGroup {
                kind: CountKind::Joint,
                rows: primary.len(),
                cols: secondary.len(),
                queries,
            }
        }
        _ => {
            let n = primary.len();
            let mut queries = Vec::with_capacity(n * (n - 1) / 2);
            for row in 1..n {
                for col in 0..row {
                    queries.push(PlannedQuery {
                        row,
                        col,
                        mirrored: true,
                        terms: query_terms(filters, Some(&primary[row]), Some(&primary[col])),
                    });
                }
            }
            QueryGroup {
                kind: CountKind::Joint,
                rows: n,
                cols: n,
                queries,
            }
        }
    };
    groups.push(joint);

    let plan = QueryPlan {
        scoring_function: function,
        groups,
    };

    tracing::debug!(
        scoring_function = %function,
        queries = plan.queries_per_backend_site(),
        "Query plan built"
    );

    Ok(plan)
}

/// Query entries: synonym groups, then basic filters, then pattern filters
fn query_terms(
    filters: &RequiredFilters,
    primary: Option<&Term>,
    secondary: Option<&Term>,
) -> Vec<String> {
    primary
        .into_iter()
        .chain(secondary)
        .map(Term::query_fragment)
        .chain(filters.render(primary, secondary))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TermSet;

    fn terms(values: &[&str]) -> TermSet {
        TermSet::from_lines(values.iter().copied()).unwrap()
    }

    #[test]
    fn test_co_occurrence_pairs_enumerated_once() {
        let settings =
            AnalysisSettings::new(ScoringFunction::Cooc1, terms(&["jazz", "blues", "rock"]), None);
        let plan = plan_queries(&settings, 1).unwrap();

        assert_eq!(plan.groups.len(), 1);
        let joint = plan.group(CountKind::Joint).unwrap();
        let cells: Vec<(usize, usize)> = joint.queries.iter().map(|q| (q.row, q.col)).collect();
        assert_eq!(cells, vec![(1, 0), (2, 0), (2, 1)]);
        assert!(joint.queries.iter().all(|q| q.mirrored));
        assert_eq!(joint.queries[0].terms, vec!["blues", "jazz"]);
    }

    #[test]
    fn test_cooc2_adds_primary_self_counts() {
        let settings =
            AnalysisSettings::new(ScoringFunction::Cooc2, terms(&["jazz", "blues", "rock", "pop"]), None);
        let plan = plan_queries(&settings, 1).unwrap();
        assert_eq!(plan.group(CountKind::Primary).unwrap().queries.len(), 4);
        assert_eq!(plan.group(CountKind::Joint).unwrap().queries.len(), 6);
        assert_eq!(plan.total_submissions(2, 3), 60);
        assert_eq!(
            plan.total_submissions(2, 3),
            ScoringFunction::Cooc2.raw_query_count(4, 0, 2, 3)
        );
    }

    #[test]
    fn test_cross_tab_grid_and_secondary_counts() {
        let settings = AnalysisSettings::new(
            ScoringFunction::CrossTab2,
            terms(&["beethoven", "coltrane"]),
            Some(terms(&["classical", "jazz", "rock"])),
        );
        let plan = plan_queries(&settings, 1).unwrap();

        assert!(plan.group(CountKind::Primary).is_none());
        let secondary = plan.group(CountKind::Secondary).unwrap();
        assert_eq!(secondary.queries[2].terms, vec!["rock"]);

        let joint = plan.group(CountKind::Joint).unwrap();
        assert_eq!((joint.rows, joint.cols), (2, 3));
        assert_eq!(joint.queries.len(), 6);
        assert_eq!(joint.queries[4].terms, vec!["coltrane", "jazz"]);
        assert!(joint.queries.iter().all(|q| !q.mirrored));
    }

    #[test]
    fn test_query_terms_order_with_filters() {
        let mut settings = AnalysisSettings::new(
            ScoringFunction::CrossTab3,
            terms(&["hip hop <SYNONYM> rap"]),
            Some(terms(&["new york"])),
        );
        settings.filters = RequiredFilters::parse(&[
            "<PRIMARY_SEARCH_STRING> from <SECONDARY_SEARCH_STRING>",
            "music",
        ]);
        let plan = plan_queries(&settings, 1).unwrap();
        let query = &plan.group(CountKind::Joint).unwrap().queries[0];
        assert_eq!(
            query.terms,
            vec![
                "\"hip hop\" OR \"rap\"",
                "new york",
                "\"music\"",
                "\"hip hop from new york\"",
            ]
        );
    }

    #[test]
    fn test_validation_order() {
        let empty = AnalysisSettings::new(ScoringFunction::Cooc1, TermSet::default(), None);
        assert!(matches!(
            plan_queries(&empty, 0),
            Err(AnalysisError::Config { field, .. }) if field == "primary terms"
        ));

        let single = AnalysisSettings::new(ScoringFunction::Cooc1, terms(&["jazz"]), None);
        assert!(matches!(
            plan_queries(&single, 1),
            Err(AnalysisError::Config { field, .. }) if field == "primary terms"
        ));

        let no_secondary = AnalysisSettings::new(ScoringFunction::CrossTab1, terms(&["jazz"]), None);
        assert!(matches!(
            plan_queries(&no_secondary, 1),
            Err(AnalysisError::Config { field, .. }) if field == "secondary terms"
        ));

        let no_backend = AnalysisSettings::new(ScoringFunction::Cooc1, terms(&["jazz", "blues"]), None);
        assert!(matches!(
            plan_queries(&no_backend, 0),
            Err(AnalysisError::Config { field, .. }) if field == "backends"
        ));
    }

    #[test]
    fn test_cross_tab_allows_single_primary_term() {
        let settings = AnalysisSettings::new(
            ScoringFunction::CrossTab1,
            terms(&["beethoven"]),
            Some(terms(&["classical", "jazz"])),
        );
        let plan = plan_queries(&settings, 1).unwrap();
        assert_eq!(plan.queries_per_backend_site(), 3);
    }
}
