//! Search terms and synonym groups

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use webminer_common::{Error, Result};

/// Tag separating synonyms in the textual term form
pub const SYNONYM_TAG: &str = "<SYNONYM>";

/// Separator used when synonyms are joined for display
pub const LABEL_SEPARATOR: &str = " / ";

/// One logical search term: a display label and its synonyms.
///
/// The first synonym is canonical and is the one substituted into
/// pattern-based filter strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Term {
    label: String,
    synonyms: Vec<String>,
}

impl Term {
    pub fn new(label: impl Into<String>, synonyms: Vec<String>) -> Result<Self> {
        if synonyms.is_empty() {
            return Err(Error::InvalidInput("Term has no synonyms".to_string()));
        }
        if let Some(blank) = synonyms.iter().position(|s| s.trim().is_empty()) {
            return Err(Error::InvalidInput(format!(
                "Synonym {} of term is blank",
                blank + 1
            )));
        }
        Ok(Self {
            label: label.into(),
            synonyms,
        })
    }

    /// Build a term whose label is its synonyms joined with " / "
    pub fn from_synonyms(synonyms: Vec<String>) -> Result<Self> {
        let label = synonyms.join(LABEL_SEPARATOR);
        Self::new(label, synonyms)
    }

    /// Parse `"jazz <SYNONYM> swing"` into a two-synonym term
    pub fn parse(text: &str) -> Result<Self> {
        let synonyms = text
            .split(SYNONYM_TAG)
            .map(|s| s.trim().to_string())
            .collect();
        Self::from_synonyms(synonyms)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    pub fn canonical(&self) -> &str {
        &self.synonyms[0]
    }

    /// Query entry for this synonym group.
    ///
    /// A single synonym is used verbatim; several become an OR-disjunction
    /// of quoted synonyms.
    pub fn query_fragment(&self) -> String {
        if self.synonyms.len() == 1 {
            return self.synonyms[0].clone();
        }
        self.synonyms
            .iter()
            .map(|s| format!("\"{}\"", s))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

/// Ordered sequence of terms forming one axis of the analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TermSet {
    terms: Vec<Term>,
}

impl TermSet {
    pub fn new(terms: Vec<Term>) -> Self {
        Self { terms }
    }

    /// Parse one term per line, skipping blank and repeated lines
    pub fn from_lines<'a, I>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() || !seen.insert(line.to_string()) {
                continue;
            }
            terms.push(Term::parse(line)?);
        }
        Ok(Self { terms })
    }

    /// Load a UTF-8 text file with one term per line
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_lines(content.lines())
            .map_err(|e| Error::InvalidInput(format!("{} ({})", e, path.display())))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Term> {
        self.terms.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Term> {
        self.terms.iter()
    }

    pub fn labels(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.label().to_string()).collect()
    }
}

impl std::ops::Index<usize> for TermSet {
    type Output = Term;

    fn index(&self, index: usize) -> &Term {
        &self.terms[index]
    }
}
