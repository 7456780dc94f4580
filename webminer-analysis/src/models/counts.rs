//! Raw hit-count tables, combined counts and score matrices

use serde::Serialize;
use std::fmt;

/// Which of the three counts a query contributes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountKind {
    /// C(a): self-counts of primary terms
    Primary,
    /// C(b): self-counts of secondary terms
    Secondary,
    /// C(a,b): joint counts
    Joint,
}

impl fmt::Display for CountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountKind::Primary => write!(f, "C(a)"),
            CountKind::Secondary => write!(f, "C(b)"),
            CountKind::Joint => write!(f, "C(a,b)"),
        }
    }
}

/// Position of one count: backend, site and term cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CountKey {
    pub backend: usize,
    pub site: usize,
    pub row: usize,
    /// Always 0 for self-count tables
    pub col: usize,
}

/// Non-negative hit counts indexed by backend, site and term cell.
///
/// Self-count tables have a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawCounts {
    backends: usize,
    sites: usize,
    rows: usize,
    cols: usize,
    values: Vec<u64>,
}

impl RawCounts {
    pub fn new(backends: usize, sites: usize, rows: usize, cols: usize) -> Self {
        Self {
            backends,
            sites,
            rows,
            cols,
            values: vec![0; backends * sites * rows * cols],
        }
    }

    /// Self-count table (one column)
    pub fn single(backends: usize, sites: usize, rows: usize) -> Self {
        Self::new(backends, sites, rows, 1)
    }

    fn offset(&self, key: CountKey) -> usize {
        debug_assert!(key.backend < self.backends && key.site < self.sites);
        debug_assert!(key.row < self.rows && key.col < self.cols);
        ((key.backend * self.sites + key.site) * self.rows + key.row) * self.cols + key.col
    }

    pub fn get(&self, key: CountKey) -> u64 {
        self.values[self.offset(key)]
    }

    pub fn set(&mut self, key: CountKey, value: u64) {
        let offset = self.offset(key);
        self.values[offset] = value;
    }

    pub fn backends(&self) -> usize {
        self.backends
    }

    pub fn sites(&self) -> usize {
        self.sites
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Sum of every cell of one backend/site slice
    pub fn slice_total(&self, backend: usize, site: usize) -> u64 {
        let start = (backend * self.sites + site) * self.rows * self.cols;
        self.values[start..start + self.rows * self.cols]
            .iter()
            .fold(0, |total, v| total.saturating_add(*v))
    }

    pub fn backend_total(&self, backend: usize) -> u64 {
        (0..self.sites).fold(0, |total, s| total.saturating_add(self.slice_total(backend, s)))
    }

    pub fn site_total(&self, site: usize) -> u64 {
        (0..self.backends).fold(0, |total, b| total.saturating_add(self.slice_total(b, site)))
    }
}

/// The raw tables collected for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawCountSet {
    pub primary: Option<RawCounts>,
    pub secondary: Option<RawCounts>,
    pub joint: Option<RawCounts>,
}

impl RawCountSet {
    pub fn get(&self, kind: CountKind) -> Option<&RawCounts> {
        match kind {
            CountKind::Primary => self.primary.as_ref(),
            CountKind::Secondary => self.secondary.as_ref(),
            CountKind::Joint => self.joint.as_ref(),
        }
    }

    pub fn get_mut(&mut self, kind: CountKind) -> &mut Option<RawCounts> {
        match kind {
            CountKind::Primary => &mut self.primary,
            CountKind::Secondary => &mut self.secondary,
            CountKind::Joint => &mut self.joint,
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &RawCounts> {
        [&self.primary, &self.secondary, &self.joint]
            .into_iter()
            .filter_map(|t| t.as_ref())
    }
}

/// Dense real-valued matrix (row-major)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        debug_assert!(rows.iter().all(|r| r.len() == cols));
        Self {
            rows: rows.len(),
            cols,
            values: rows.into_iter().flatten().collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    /// First column as a vector (self-count tables)
    pub fn column_vector(&self) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, 0)).collect()
    }
}

/// Final scores; `None` marks undefined cells (co-occurrence diagonal,
/// undefined zero-denominator results)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Option<f64>>,
}

impl ScoreMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<Option<f64>>>) -> Self {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        Self {
            rows: rows.len(),
            cols,
            cells: rows.into_iter().flatten().collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.cells[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Option<f64>) {
        self.cells[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[Option<f64>] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [Option<f64>] {
        let cols = self.cols;
        &mut self.cells[row * cols..(row + 1) * cols]
    }

    pub fn cells_mut(&mut self) -> &mut [Option<f64>] {
        &mut self.cells
    }

    pub fn defined_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.cells.iter().filter_map(|c| *c)
    }
}
