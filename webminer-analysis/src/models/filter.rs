//! Required filter strings
//!
//! Basic filters are added to every query as quoted literals. Pattern-based
//! filters carry named slots that are resolved against the terms of each
//! individual query.

use super::term::Term;
use serde::Serialize;

/// Slot filled with the canonical synonym of the query's primary term
pub const PRIMARY_SLOT: &str = "<PRIMARY_SEARCH_STRING>";

/// Slot filled with the canonical synonym of the query's secondary term
pub const SECONDARY_SLOT: &str = "<SECONDARY_SEARCH_STRING>";

/// One piece of a filter template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Segment {
    Literal(String),
    Primary,
    Secondary,
}

/// A filter string with named slots, parsed once
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FilterTemplate {
    /// Parse `text`, returning `None` when it contains no slot
    pub fn parse(text: &str) -> Option<Self> {
        let mut segments = Vec::new();
        let mut rest = text;

        loop {
            let next = [(PRIMARY_SLOT, Segment::Primary), (SECONDARY_SLOT, Segment::Secondary)]
                .into_iter()
                .filter_map(|(slot, segment)| rest.find(slot).map(|at| (at, slot, segment)))
                .min_by_key(|(at, _, _)| *at);

            match next {
                Some((at, slot, segment)) => {
                    if at > 0 {
                        segments.push(Segment::Literal(rest[..at].to_string()));
                    }
                    segments.push(segment);
                    rest = &rest[at + slot.len()..];
                }
                None => {
                    if !rest.is_empty() {
                        segments.push(Segment::Literal(rest.to_string()));
                    }
                    break;
                }
            }
        }

        if segments
            .iter()
            .any(|s| matches!(s, Segment::Primary | Segment::Secondary))
        {
            Some(Self {
                source: text.to_string(),
                segments,
            })
        } else {
            None
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resolve slots and quote the result.
    ///
    /// A slot whose term is absent from the query resolves to nothing.
    pub fn render(&self, primary: Option<&Term>, secondary: Option<&Term>) -> String {
        let mut rendered = String::from("\"");
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Primary => {
                    if let Some(term) = primary {
                        rendered.push_str(term.canonical());
                    }
                }
                Segment::Secondary => {
                    if let Some(term) = secondary {
                        rendered.push_str(term.canonical());
                    }
                }
            }
        }
        rendered.push('"');
        rendered
    }
}

/// All required filter strings of a run, split into basic and pattern-based
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequiredFilters {
    pub basic: Vec<String>,
    pub patterns: Vec<FilterTemplate>,
}

impl RequiredFilters {
    pub fn parse<S: AsRef<str>>(filters: &[S]) -> Self {
        let mut parsed = Self::default();
        for filter in filters {
            let filter = filter.as_ref();
            match FilterTemplate::parse(filter) {
                Some(template) => parsed.patterns.push(template),
                None => parsed.basic.push(filter.to_string()),
            }
        }
        parsed
    }

    pub fn is_empty(&self) -> bool {
        self.basic.is_empty() && self.patterns.is_empty()
    }

    /// Filter entries for one query: basic filters then rendered patterns
    pub fn render(&self, primary: Option<&Term>, secondary: Option<&Term>) -> Vec<String> {
        self.basic
            .iter()
            .map(|f| format!("\"{}\"", f))
            .chain(self.patterns.iter().map(|p| p.render(primary, secondary)))
            .collect()
    }
}
