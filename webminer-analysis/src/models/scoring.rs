//! Scoring function selector and its fixed requirements table

use super::counts::CountKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Analysis mode, implied by the scoring function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    /// Pairwise association among the primary terms
    CoOccurrence,
    /// Association of every primary term with every secondary term
    CrossTabulation,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::CoOccurrence => write!(f, "co-occurrence"),
            AnalysisMode::CrossTabulation => write!(f, "cross-tabulation"),
        }
    }
}

/// The six closed-form scoring functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringFunction {
    /// C(a1,a2) / (1 + Σ C(a1,c) · Σ C(d,a2)), pair members excluded from the sums
    #[serde(rename = "cooc-1")]
    Cooc1,
    /// (C(a1,a2) / C(a2)) × (1 - |C(a1) - C(a2)| / max C(a))
    #[serde(rename = "cooc-2")]
    Cooc2,
    /// C(a,b) / C(a)
    #[serde(rename = "cross-tab-1")]
    CrossTab1,
    /// C(a,b) / C(b)
    #[serde(rename = "cross-tab-2")]
    CrossTab2,
    /// C(a,b) / (1 + Σ_c C(c,b))
    #[serde(rename = "cross-tab-3")]
    CrossTab3,
    /// C(a,b) / (1 + Σ_c C(a,c))
    #[serde(rename = "cross-tab-4")]
    CrossTab4,
}

impl ScoringFunction {
    pub const ALL: [ScoringFunction; 6] = [
        ScoringFunction::Cooc1,
        ScoringFunction::Cooc2,
        ScoringFunction::CrossTab1,
        ScoringFunction::CrossTab2,
        ScoringFunction::CrossTab3,
        ScoringFunction::CrossTab4,
    ];

    pub fn mode(&self) -> AnalysisMode {
        match self {
            ScoringFunction::Cooc1 | ScoringFunction::Cooc2 => AnalysisMode::CoOccurrence,
            _ => AnalysisMode::CrossTabulation,
        }
    }

    pub fn is_cross_tabulation(&self) -> bool {
        self.mode() == AnalysisMode::CrossTabulation
    }

    pub fn requires(&self, kind: CountKind) -> bool {
        match kind {
            CountKind::Primary => matches!(self, ScoringFunction::Cooc2 | ScoringFunction::CrossTab1),
            CountKind::Secondary => matches!(self, ScoringFunction::CrossTab2),
            CountKind::Joint => true,
        }
    }

    /// Count kinds to collect, in collection order
    pub fn required_counts(&self) -> Vec<CountKind> {
        [CountKind::Primary, CountKind::Secondary, CountKind::Joint]
            .into_iter()
            .filter(|k| self.requires(*k))
            .collect()
    }

    /// Number of distinct queries per backend and site
    pub fn queries_per_backend_site(&self, primary_len: usize, secondary_len: usize) -> usize {
        let joint = match self.mode() {
            AnalysisMode::CoOccurrence => primary_len * primary_len.saturating_sub(1) / 2,
            AnalysisMode::CrossTabulation => primary_len * secondary_len,
        };
        let mut total = joint;
        if self.requires(CountKind::Primary) {
            total += primary_len;
        }
        if self.requires(CountKind::Secondary) {
            total += secondary_len;
        }
        total
    }

    /// Total number of backend submissions for a run
    pub fn raw_query_count(
        &self,
        primary_len: usize,
        secondary_len: usize,
        backends: usize,
        sites: usize,
    ) -> usize {
        self.queries_per_backend_site(primary_len, secondary_len) * backends * sites
    }

    /// Collection sub-tasks plus the scoring/report task
    pub fn top_level_tasks(&self) -> usize {
        self.required_counts().len() + 1
    }

    pub fn formula(&self) -> &'static str {
        match self {
            ScoringFunction::Cooc1 => {
                "S(a1,a2) = C(a1,a2) / (1 + SUM[c!=a1,a2] C(a1,c) * SUM[d!=a1,a2] C(d,a2))"
            }
            ScoringFunction::Cooc2 => {
                "S(a1,a2) = (C(a1,a2) / C(a2)) * (1 - |C(a1) - C(a2)| / MAX[i] C(i))"
            }
            ScoringFunction::CrossTab1 => "S(a,b) = C(a,b) / C(a)",
            ScoringFunction::CrossTab2 => "S(a,b) = C(a,b) / C(b)",
            ScoringFunction::CrossTab3 => "S(a,b) = C(a,b) / (1 + SUM[c] C(c,b))",
            ScoringFunction::CrossTab4 => "S(a,b) = C(a,b) / (1 + SUM[c] C(a,c))",
        }
    }
}

impl fmt::Display for ScoringFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScoringFunction::Cooc1 => "cooc-1",
            ScoringFunction::Cooc2 => "cooc-2",
            ScoringFunction::CrossTab1 => "cross-tab-1",
            ScoringFunction::CrossTab2 => "cross-tab-2",
            ScoringFunction::CrossTab3 => "cross-tab-3",
            ScoringFunction::CrossTab4 => "cross-tab-4",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements_table() {
        use CountKind::*;
        assert_eq!(ScoringFunction::Cooc1.required_counts(), vec![Joint]);
        assert_eq!(ScoringFunction::Cooc2.required_counts(), vec![Primary, Joint]);
        assert_eq!(ScoringFunction::CrossTab1.required_counts(), vec![Primary, Joint]);
        assert_eq!(ScoringFunction::CrossTab2.required_counts(), vec![Secondary, Joint]);
        assert_eq!(ScoringFunction::CrossTab3.required_counts(), vec![Joint]);
        assert_eq!(ScoringFunction::CrossTab4.required_counts(), vec![Joint]);
    }

    #[test]
    fn test_modes() {
        assert_eq!(ScoringFunction::Cooc2.mode(), AnalysisMode::CoOccurrence);
        assert!(ScoringFunction::CrossTab3.is_cross_tabulation());
    }

    #[test]
    fn test_raw_query_count() {
        // 4 terms -> 6 pairs, plus 4 self counts, 2 backends, 3 sites
        assert_eq!(ScoringFunction::Cooc2.raw_query_count(4, 0, 2, 3), 60);
        assert_eq!(ScoringFunction::Cooc1.raw_query_count(4, 0, 1, 1), 6);
        assert_eq!(ScoringFunction::CrossTab2.raw_query_count(2, 3, 1, 1), 9);
        assert_eq!(ScoringFunction::CrossTab4.raw_query_count(2, 3, 1, 2), 12);
    }

    #[test]
    fn test_top_level_tasks() {
        assert_eq!(ScoringFunction::Cooc1.top_level_tasks(), 2);
        assert_eq!(ScoringFunction::CrossTab1.top_level_tasks(), 3);
    }

    #[test]
    fn test_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            f: ScoringFunction,
        }
        let w: Wrapper = toml::from_str("f = \"cross-tab-3\"").unwrap();
        assert_eq!(w.f, ScoringFunction::CrossTab3);
        assert_eq!(ScoringFunction::CrossTab3.to_string(), "cross-tab-3");
    }
}
