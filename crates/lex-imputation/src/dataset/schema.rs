//! Attribute and schema definitions.

use crate::dataset::{Row, is_missing};
use crate::error::{ImputationError, Result};
use serde::{Deserialize, Serialize};

/// Kind of an attribute.
///
/// Nominal values are stored in rows as numeric codes indexing `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeKind {
    /// Real-valued attribute
    Numeric,
    /// Categorical attribute with an ordered set of labels
    Nominal { values: Vec<String> },
}

impl AttributeKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric)
    }

    pub fn is_nominal(&self) -> bool {
        matches!(self, Self::Nominal { .. })
    }

    /// Short lowercase name used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Nominal { .. } => "nominal",
        }
    }

    /// Number of labels for nominal attributes.
    pub fn num_values(&self) -> Option<usize> {
        match self {
            Self::Numeric => None,
            Self::Nominal { values } => Some(values.len()),
        }
    }
}

/// A single column of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    index: usize,
    name: String,
    kind: AttributeKind,
}

impl Attribute {
    /// A numeric attribute. The index is assigned by [`Schema::new`].
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            index: 0,
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    /// A nominal attribute with the given labels, in code order.
    pub fn nominal<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self {
            index: 0,
            name: name.into(),
            kind: AttributeKind::Nominal {
                values: values.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    pub fn is_numeric(&self) -> bool {
        self.kind.is_numeric()
    }

    pub fn is_nominal(&self) -> bool {
        self.kind.is_nominal()
    }

    /// Code of a nominal label, if this attribute defines it.
    pub fn code_of(&self, label: &str) -> Option<f64> {
        match &self.kind {
            AttributeKind::Numeric => None,
            AttributeKind::Nominal { values } => {
                values.iter().position(|v| v == label).map(|i| i as f64)
            }
        }
    }

    /// Label for a nominal code.
    pub fn label_of(&self, code: f64) -> Option<&str> {
        match &self.kind {
            AttributeKind::Numeric => None,
            AttributeKind::Nominal { values } => {
                if code.fract() != 0.0 || code < 0.0 {
                    return None;
                }
                values.get(code as usize).map(String::as_str)
            }
        }
    }

    /// Check that a cell value is acceptable for this attribute.
    ///
    /// Missing is always acceptable. Nominal cells must be an in-range code.
    pub fn validate_value(&self, value: f64) -> Result<()> {
        if is_missing(value) || self.is_numeric() {
            return Ok(());
        }
        if self.label_of(value).is_none() {
            return Err(ImputationError::InvalidValue {
                attribute: self.name.clone(),
                reason: format!(
                    "{} is not a valid code (expected 0..{})",
                    value,
                    self.kind.num_values().unwrap_or(0)
                ),
            });
        }
        Ok(())
    }
}

/// Structure of a dataset: its attributes and the designated target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    attributes: Vec<Attribute>,
    target_index: usize,
}

impl Schema {
    /// Create a schema, assigning attribute indices in order.
    pub fn new(mut attributes: Vec<Attribute>, target_index: usize) -> Result<Self> {
        if attributes.is_empty() {
            return Err(ImputationError::InvalidConfig(
                "a dataset needs at least one attribute".to_string(),
            ));
        }
        if target_index >= attributes.len() {
            return Err(ImputationError::InvalidConfig(format!(
                "target index {} out of range for {} attributes",
                target_index,
                attributes.len()
            )));
        }

        for (index, attribute) in attributes.iter_mut().enumerate() {
            attribute.index = index;
            if let AttributeKind::Nominal { values } = &attribute.kind {
                if values.is_empty() {
                    return Err(ImputationError::InvalidConfig(format!(
                        "nominal attribute '{}' has no values",
                        attribute.name
                    )));
                }
                for (i, value) in values.iter().enumerate() {
                    if values[..i].contains(value) {
                        return Err(ImputationError::InvalidConfig(format!(
                            "nominal attribute '{}' declares '{}' twice",
                            attribute.name, value
                        )));
                    }
                }
            }
        }

        Ok(Self {
            attributes,
            target_index,
        })
    }

    /// Create a schema whose target is looked up by name.
    pub fn with_target_name(attributes: Vec<Attribute>, target: &str) -> Result<Self> {
        let target_index = attributes
            .iter()
            .position(|a| a.name == target)
            .ok_or_else(|| ImputationError::AttributeNotFound(target.to_string()))?;
        Self::new(attributes, target_index)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, index: usize) -> &Attribute {
        &self.attributes[index]
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn target(&self) -> &Attribute {
        &self.attributes[self.target_index]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Check a row against this schema: cell count and nominal codes.
    pub fn validate_row(&self, row: &Row) -> Result<()> {
        if row.len() != self.attributes.len() {
            return Err(ImputationError::SchemaMismatch {
                expected: self.attributes.len(),
                actual: row.len(),
            });
        }
        for attribute in &self.attributes {
            attribute.validate_value(row.value(attribute.index))?;
        }
        Ok(())
    }
}
