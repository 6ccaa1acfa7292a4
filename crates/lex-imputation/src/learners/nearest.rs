//! k-nearest-neighbour learner usable for both attribute kinds.

use super::encoding::{FeatureEncoder, NominalEncoding};
use super::{Learner, Predictor, training_targets};
use crate::dataset::{AttributeKind, Row, Schema};
use crate::error::Result;
use crate::statistics;
use ndarray::Array2;

/// Predicts from the `k` closest training rows by Euclidean distance over
/// standardised features.
///
/// Distance ties are broken in favour of the earlier training row. Numeric
/// attributes take the neighbours' mean; nominal attributes take the most
/// common code, smallest code first on ties.
#[derive(Debug, Clone)]
pub struct NearestNeighborLearner {
    k: usize,
}

impl NearestNeighborLearner {
    pub fn new(k: usize) -> Self {
        Self { k: k.max(1) }
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl Default for NearestNeighborLearner {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Learner for NearestNeighborLearner {
    fn name(&self) -> &str {
        "nearest_neighbor"
    }

    fn supports(&self, _kind: &AttributeKind) -> bool {
        true
    }

    fn fit(&self, schema: &Schema, rows: &[&Row], dependent: usize) -> Result<Box<dyn Predictor>> {
        let (rows, targets) = training_targets(schema, rows, dependent)?;
        let encoder = FeatureEncoder::fit(schema, &rows, dependent, NominalEncoding::OneHot);
        let points = encoder.encode_rows(&rows);

        Ok(Box::new(NeighborModel {
            encoder,
            points,
            targets,
            k: self.k,
            nominal: schema.attribute(dependent).is_nominal(),
        }))
    }
}

#[derive(Debug)]
struct NeighborModel {
    encoder: FeatureEncoder,
    /// One encoded training row per matrix row
    points: Array2<f64>,
    targets: Vec<f64>,
    k: usize,
    nominal: bool,
}

impl Predictor for NeighborModel {
    fn predict(&self, row: &Row) -> Result<f64> {
        let query = self.encoder.encode(row);
        let mut distances: Vec<(usize, f64)> = self
            .points
            .rows()
            .into_iter()
            .map(|point| (&point - &query).mapv(|d| d * d).sum())
            .enumerate()
            .collect();
        // Stable sort keeps row order among equal distances
        distances.sort_by(|a, b| a.1.total_cmp(&b.1));

        let neighbours: Vec<f64> = distances
            .iter()
            .take(self.k)
            .map(|&(i, _)| self.targets[i])
            .collect();

        Ok(if self.nominal {
            statistics::mode(&neighbours)
        } else {
            statistics::mean(&neighbours)
        })
    }
}
