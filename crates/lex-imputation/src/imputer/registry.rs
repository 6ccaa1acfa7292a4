//! Per-attribute trained models retained after a run.

use crate::dataset::{Row, Schema};
use crate::error::{ImputationError, Result};
use crate::learners::Predictor;
use std::fmt;
use std::sync::Arc;

/// The model last fitted for each attribute during training.
///
/// Attributes that were complete, or that are the target, have no entry.
/// Read-only once training finishes, and shareable across threads.
#[derive(Clone)]
pub struct AttributeModels {
    schema: Arc<Schema>,
    models: Vec<Option<Arc<dyn Predictor>>>,
}

static_assertions::assert_impl_all!(AttributeModels: Send, Sync);

impl AttributeModels {
    pub(crate) fn new(schema: Arc<Schema>) -> Self {
        let models = vec![None; schema.len()];
        Self { schema, models }
    }

    pub(crate) fn insert(&mut self, attribute: usize, model: Arc<dyn Predictor>) {
        self.models[attribute] = Some(model);
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Model for `attribute`, if one was trained.
    pub fn get(&self, attribute: usize) -> Option<&Arc<dyn Predictor>> {
        self.models.get(attribute).and_then(Option::as_ref)
    }

    /// Indices of attributes that have a model, ascending.
    pub fn trained_attributes(&self) -> impl Iterator<Item = usize> + '_ {
        self.models
            .iter()
            .enumerate()
            .filter_map(|(index, model)| model.as_ref().map(|_| index))
    }

    /// Number of attributes with a model.
    pub fn len(&self) -> usize {
        self.models.iter().filter(|m| m.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill the missing non-target cells of `row` that have a model.
    ///
    /// Attributes are visited in index order, so later predictions see the
    /// values filled in by earlier ones. Cells without a model stay missing.
    /// Returns the number of cells filled.
    pub fn impute_row(&self, row: &mut Row) -> Result<usize> {
        self.schema.validate_row(row)?;
        let target = self.schema.target_index();

        let mut filled = 0;
        for attribute in self.schema.attributes() {
            let index = attribute.index();
            if index == target || !row.is_missing(index) {
                continue;
            }
            let Some(model) = self.get(index) else {
                continue;
            };
            let value = model.predict(row)?;
            if !value.is_finite() {
                return Err(ImputationError::predictor(
                    attribute.name(),
                    format!("non-finite prediction {}", value),
                ));
            }
            attribute.validate_value(value)?;
            row.set(index, value);
            filled += 1;
        }
        Ok(filled)
    }
}

impl fmt::Debug for AttributeModels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trained: Vec<&str> = self
            .trained_attributes()
            .map(|i| self.schema.attribute(i).name())
            .collect();
        f.debug_struct("AttributeModels")
            .field("trained", &trained)
            .finish()
    }
}
