//! Turning rows into dense feature vectors for the built-in learners.

use crate::dataset::{AttributeKind, Row, Schema};
use crate::statistics;
use ndarray::{Array1, Array2};

/// How nominal features are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NominalEncoding {
    /// One indicator per label
    OneHot,
    /// One indicator per label except the first, for models with an intercept
    DropFirst,
}

#[derive(Debug, Clone)]
enum Feature {
    Numeric {
        index: usize,
        center: f64,
        scale: f64,
    },
    Nominal {
        index: usize,
        fill: f64,
        labels: usize,
        skip_first: bool,
    },
}

impl Feature {
    fn width(&self) -> usize {
        match self {
            Self::Numeric { .. } => 1,
            Self::Nominal {
                labels, skip_first, ..
            } => labels - usize::from(*skip_first),
        }
    }
}

/// Encodes every attribute except the dependent one.
///
/// Numeric features are standardised with the training mean and standard
/// deviation. Missing or non-finite inputs are replaced by the training mean
/// (numeric) or mode (nominal) before encoding.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    features: Vec<Feature>,
    width: usize,
}

impl FeatureEncoder {
    pub fn fit(schema: &Schema, rows: &[&Row], dependent: usize, nominal: NominalEncoding) -> Self {
        let features: Vec<Feature> = schema
            .attributes()
            .iter()
            .filter(|a| a.index() != dependent)
            .map(|attribute| {
                let index = attribute.index();
                let observed: Vec<f64> = rows
                    .iter()
                    .map(|row| row.value(index))
                    .filter(|v| v.is_finite())
                    .collect();
                match attribute.kind() {
                    AttributeKind::Numeric => {
                        let center = statistics::mean(&observed);
                        let variance = if observed.is_empty() {
                            0.0
                        } else {
                            observed.iter().map(|v| (v - center).powi(2)).sum::<f64>()
                                / observed.len() as f64
                        };
                        let std = variance.sqrt();
                        Feature::Numeric {
                            index,
                            center,
                            scale: if std > 1e-12 { std } else { 1.0 },
                        }
                    }
                    AttributeKind::Nominal { values } => Feature::Nominal {
                        index,
                        fill: statistics::mode(&observed),
                        labels: values.len(),
                        skip_first: nominal == NominalEncoding::DropFirst,
                    },
                }
            })
            .collect();
        let width = features.iter().map(Feature::width).sum();
        Self { features, width }
    }

    /// Length of the vectors produced by [`encode`](Self::encode).
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn encode(&self, row: &Row) -> Array1<f64> {
        let mut out = Array1::zeros(self.width);
        let mut offset = 0;
        for feature in &self.features {
            match *feature {
                Feature::Numeric {
                    index,
                    center,
                    scale,
                } => {
                    let value = row.value(index);
                    let value = if value.is_finite() { value } else { center };
                    out[offset] = (value - center) / scale;
                }
                Feature::Nominal {
                    index,
                    fill,
                    skip_first,
                    ..
                } => {
                    let value = row.value(index);
                    let code = if value.is_finite() { value } else { fill };
                    if code >= 0.0 && code.fract() == 0.0 {
                        let code = code as usize;
                        let slot = if skip_first { code.checked_sub(1) } else { Some(code) };
                        // Out-of-range codes encode as all zeros
                        if let Some(slot) = slot.filter(|&s| s < feature.width()) {
                            out[offset + slot] = 1.0;
                        }
                    }
                }
            }
            offset += feature.width();
        }
        out
    }

    /// Encode `rows` into a matrix with one row per input row.
    pub fn encode_rows(&self, rows: &[&Row]) -> Array2<f64> {
        let mut matrix = Array2::zeros((rows.len(), self.width));
        for (mut encoded, row) in matrix.rows_mut().into_iter().zip(rows) {
            encoded.assign(&self.encode(row));
        }
        matrix
    }
}
