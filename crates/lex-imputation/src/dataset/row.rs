//! A single row of cell values.

use crate::dataset::is_missing;

/// One instance of the dataset.
///
/// Cells are `f64`; [`MISSING`](crate::dataset::MISSING) (NaN) marks a
/// missing cell and nominal cells hold label codes.
#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: Vec<f64>,
}

impl Row {
    pub fn new(cells: Vec<f64>) -> Self {
        Self { cells }
    }

    /// A row of `len` missing cells.
    pub fn missing(len: usize) -> Self {
        Self {
            cells: vec![f64::NAN; len],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn value(&self, index: usize) -> f64 {
        self.cells[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: f64) {
        self.cells[index] = value;
    }

    #[inline]
    pub fn is_missing(&self, index: usize) -> bool {
        is_missing(self.cells[index])
    }

    /// Number of missing cells in this row.
    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|v| is_missing(**v)).count()
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<f64> {
        self.cells
    }
}

impl From<Vec<f64>> for Row {
    fn from(cells: Vec<f64>) -> Self {
        Self::new(cells)
    }
}
