//! Conversion between [`Dataset`] and polars `DataFrame`s.
//!
//! Numeric columns become numeric attributes. String, categorical and boolean
//! columns become nominal attributes whose labels are listed in first-seen
//! order. Nulls (and NaN in float columns) become missing cells.

use crate::dataset::{Attribute, Dataset, MISSING, Row, Schema, is_missing};
use crate::error::{ImputationError, Result, ResultExt};
use polars::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// How a DataFrame column maps onto an attribute kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnCategory {
    Numeric,
    Nominal,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn column_category(column: &Column) -> Result<ColumnCategory> {
    let dtype = column.dtype();
    if is_numeric_dtype(dtype) {
        Ok(ColumnCategory::Numeric)
    } else if matches!(
        dtype,
        DataType::String | DataType::Boolean | DataType::Categorical(_, _) | DataType::Null
    ) {
        Ok(ColumnCategory::Nominal)
    } else {
        Err(ImputationError::UnsupportedColumnType {
            column: column.name().to_string(),
            dtype: dtype.to_string(),
        })
    }
}

fn numeric_values(column: &Column) -> Result<Vec<f64>> {
    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .context(format!("Casting '{}' to Float64", column.name()))?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(MISSING))
        .collect())
}

fn string_values(column: &Column) -> Result<Vec<Option<String>>> {
    let series = column
        .as_materialized_series()
        .cast(&DataType::String)
        .context(format!("Casting '{}' to String", column.name()))?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

impl Dataset {
    /// Build a dataset from a DataFrame.
    ///
    /// `target` names the target column; when `None` the last column is used.
    pub fn from_dataframe(df: &DataFrame, target: Option<&str>) -> Result<Self> {
        let columns = df.get_columns();
        if columns.is_empty() {
            return Err(ImputationError::InvalidConfig(
                "cannot build a dataset from a DataFrame without columns".to_string(),
            ));
        }

        let mut attributes = Vec::with_capacity(columns.len());
        let mut values: Vec<Vec<f64>> = Vec::with_capacity(columns.len());

        for column in columns {
            let name = column.name().to_string();
            match column_category(column)? {
                ColumnCategory::Numeric => {
                    attributes.push(Attribute::numeric(name));
                    values.push(numeric_values(column)?);
                }
                ColumnCategory::Nominal => {
                    let raw = string_values(column)?;
                    let mut labels: Vec<String> = Vec::new();
                    let codes = raw
                        .iter()
                        .map(|v| match v {
                            None => MISSING,
                            Some(label) => match labels.iter().position(|l| l == label) {
                                Some(code) => code as f64,
                                None => {
                                    labels.push(label.clone());
                                    (labels.len() - 1) as f64
                                }
                            },
                        })
                        .collect();
                    if labels.is_empty() {
                        // An all-null text column still needs one label to be a valid attribute
                        labels.push("?".to_string());
                    }
                    debug!("Column '{}' is nominal with {} labels", name, labels.len());
                    attributes.push(Attribute::nominal(name, labels));
                    values.push(codes);
                }
            }
        }

        let schema = match target {
            Some(name) => Schema::with_target_name(attributes, name)?,
            None => {
                let last = attributes.len() - 1;
                Schema::new(attributes, last)?
            }
        };

        let rows = (0..df.height())
            .map(|i| Row::new(values.iter().map(|col| col[i]).collect()))
            .collect();

        Ok(Dataset {
            schema: Arc::new(schema),
            rows,
        })
    }

    /// Build a dataset from a DataFrame using an existing schema.
    ///
    /// Columns are matched by name. Nominal labels must already be declared by
    /// the schema; an unseen label is an [`ImputationError::InvalidValue`].
    /// A column with no values at all is read as missing whatever its dtype.
    pub fn from_dataframe_with_schema(df: &DataFrame, schema: Arc<Schema>) -> Result<Self> {
        let mut values: Vec<Vec<f64>> = Vec::with_capacity(schema.len());

        for attribute in schema.attributes() {
            let column = df
                .column(attribute.name())
                .map_err(|_| ImputationError::AttributeNotFound(attribute.name().to_string()))?;

            if attribute.is_numeric() {
                // CSV readers type an all-empty column as text or null
                if column.null_count() == column.len() {
                    values.push(vec![MISSING; column.len()]);
                    continue;
                }
                if column_category(column)? != ColumnCategory::Numeric {
                    return Err(ImputationError::InvalidValue {
                        attribute: attribute.name().to_string(),
                        reason: format!("expected a numeric column, found {}", column.dtype()),
                    });
                }
                values.push(numeric_values(column)?);
            } else {
                let codes = string_values(column)?
                    .into_iter()
                    .map(|v| match v {
                        None => Ok(MISSING),
                        Some(label) => {
                            attribute
                                .code_of(&label)
                                .ok_or_else(|| ImputationError::InvalidValue {
                                    attribute: attribute.name().to_string(),
                                    reason: format!("unknown label '{}'", label),
                                })
                        }
                    })
                    .collect::<Result<Vec<f64>>>()?;
                values.push(codes);
            }
        }

        let rows = (0..df.height())
            .map(|i| Row::new(values.iter().map(|col| col[i]).collect()))
            .collect();

        Ok(Dataset { schema, rows })
    }

    /// Convert back into a DataFrame.
    ///
    /// Numeric attributes become `Float64` columns and nominal attributes
    /// become `String` columns; missing cells become nulls.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.schema.len());

        for attribute in self.schema.attributes() {
            let name = PlSmallStr::from(attribute.name());
            let index = attribute.index();
            let column = if attribute.is_numeric() {
                let values: Vec<Option<f64>> = self
                    .rows
                    .iter()
                    .map(|row| Some(row.value(index)).filter(|v| !is_missing(*v)))
                    .collect();
                Column::new(name, values)
            } else {
                let values: Vec<Option<&str>> = self
                    .rows
                    .iter()
                    .map(|row| attribute.label_of(row.value(index)))
                    .collect();
                Column::new(name, values)
            };
            columns.push(column);
        }

        Ok(DataFrame::new(columns)?)
    }
}
