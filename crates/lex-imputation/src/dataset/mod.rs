//! In-memory dataset model.
//!
//! A [`Dataset`] is a shared [`Schema`] plus an ordered list of [`Row`]s.
//! Missing cells are NaN; use [`MISSING`] and [`is_missing`] rather than
//! comparing against NaN directly.

mod frame;
mod row;
mod schema;

pub use row::Row;
pub use schema::{Attribute, AttributeKind, Schema};

use crate::error::Result;
use std::sync::Arc;

/// Marker value for a missing cell.
pub const MISSING: f64 = f64::NAN;

/// Whether a cell value is the missing marker.
#[inline]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// A table of rows sharing one schema.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<Schema>,
    rows: Vec<Row>,
}

impl Dataset {
    /// An empty dataset with the given structure.
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            schema: schema.into(),
            rows: Vec::new(),
        }
    }

    /// A dataset from pre-built rows; every row is validated.
    pub fn with_rows(schema: impl Into<Arc<Schema>>, rows: Vec<Row>) -> Result<Self> {
        let schema = schema.into();
        for row in &rows {
            schema.validate_row(row)?;
        }
        Ok(Self { schema, rows })
    }

    /// Append a row after validating it against the schema.
    pub fn push_row(&mut self, row: Row) -> Result<()> {
        self.schema.validate_row(&row)?;
        self.rows.push(row);
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_arc(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn row(&self, index: usize) -> &Row {
        &self.rows[index]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// All values of one attribute, in row order.
    pub fn column(&self, attribute: usize) -> Vec<f64> {
        crate::statistics::column(&self.rows, attribute)
    }

    /// Number of missing cells for one attribute.
    pub fn missing_count(&self, attribute: usize) -> usize {
        self.rows.iter().filter(|row| row.is_missing(attribute)).count()
    }

    /// Number of missing cells across the whole table.
    pub fn total_missing(&self) -> usize {
        self.rows.iter().map(Row::missing_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImputationError;

    fn schema() -> Schema {
        Schema::new(
            vec![Attribute::numeric("x"), Attribute::nominal("y", ["a", "b"])],
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_push_row_validates() {
        let mut dataset = Dataset::new(schema());
        dataset.push_row(Row::new(vec![1.0, 0.0])).unwrap();
        dataset.push_row(Row::new(vec![MISSING, 1.0])).unwrap();

        let err = dataset.push_row(Row::new(vec![1.0])).unwrap_err();
        assert!(matches!(err, ImputationError::SchemaMismatch { .. }));
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn test_missing_counts() {
        let dataset = Dataset::with_rows(
            schema(),
            vec![
                Row::new(vec![MISSING, 0.0]),
                Row::new(vec![MISSING, MISSING]),
                Row::new(vec![2.0, 1.0]),
            ],
        )
        .unwrap();

        assert_eq!(dataset.missing_count(0), 2);
        assert_eq!(dataset.missing_count(1), 1);
        assert_eq!(dataset.total_missing(), 3);
        assert_eq!(dataset.column(0).len(), 3);
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(MISSING));
        assert!(!is_missing(0.0));
        assert!(!is_missing(f64::INFINITY));
    }
}
