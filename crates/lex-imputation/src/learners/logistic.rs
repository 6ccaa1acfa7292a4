//! Multinomial logistic regression for nominal attributes.

use super::encoding::{FeatureEncoder, NominalEncoding};
use super::{Learner, Predictor, training_targets};
use crate::dataset::{AttributeKind, Row, Schema};
use crate::error::{ImputationError, Result};
use ndarray::{Array1, Array2, Axis};

/// Softmax regression trained by full-batch gradient descent.
///
/// Training starts from zero weights and visits rows in order, so the fitted
/// model is deterministic for a given input.
#[derive(Debug, Clone)]
pub struct LogisticRegressionLearner {
    alpha: f64,
    learning_rate: f64,
    max_iter: usize,
    tol: f64,
}

impl LogisticRegressionLearner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set L2 regularization strength (intercepts are not penalised)
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.max(0.0);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }
}

impl Default for LogisticRegressionLearner {
    fn default() -> Self {
        Self {
            alpha: 1e-4,
            learning_rate: 0.5,
            max_iter: 500,
            tol: 1e-6,
        }
    }
}

impl Learner for LogisticRegressionLearner {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn supports(&self, kind: &AttributeKind) -> bool {
        kind.is_nominal()
    }

    fn fit(&self, schema: &Schema, rows: &[&Row], dependent: usize) -> Result<Box<dyn Predictor>> {
        let attribute = schema.attribute(dependent);
        let classes = attribute.kind().num_values().ok_or_else(|| {
            ImputationError::predictor(attribute.name(), "logistic regression needs a nominal attribute")
        })?;
        let (rows, targets) = training_targets(schema, rows, dependent)?;
        let encoder = FeatureEncoder::fit(schema, &rows, dependent, NominalEncoding::OneHot);

        let x = encoder.encode_rows(&rows);
        let n = x.nrows() as f64;
        let mut y = Array2::<f64>::zeros((x.nrows(), classes));
        for (i, &t) in targets.iter().enumerate() {
            y[[i, t as usize]] = 1.0;
        }

        let mut weights = Array2::<f64>::zeros((encoder.width(), classes));
        let mut bias = Array1::<f64>::zeros(classes);

        for _ in 0..self.max_iter {
            let mut probs = x.dot(&weights) + &bias;
            softmax_rows(&mut probs);
            let errors = probs - &y;

            let grad_w = x.t().dot(&errors) / n + self.alpha * &weights;
            let grad_b = errors.sum_axis(Axis(0)) / n;

            let norm = (grad_w.mapv(|g| g * g).sum() + grad_b.mapv(|g| g * g).sum()).sqrt();
            if norm < self.tol {
                break;
            }

            weights.scaled_add(-self.learning_rate, &grad_w);
            bias.scaled_add(-self.learning_rate, &grad_b);
        }

        if weights.iter().chain(bias.iter()).any(|v| !v.is_finite()) {
            return Err(ImputationError::predictor(
                attribute.name(),
                "gradient descent diverged",
            ));
        }

        Ok(Box::new(LogisticModel {
            encoder,
            weights,
            bias,
        }))
    }
}

/// Row-wise softmax, shifted by each row's maximum.
fn softmax_rows(logits: &mut Array2<f64>) {
    for mut row in logits.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let total = row.sum();
        row.mapv_inplace(|v| v / total);
    }
}

#[derive(Debug)]
struct LogisticModel {
    encoder: FeatureEncoder,
    /// features x classes
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl Predictor for LogisticModel {
    fn predict(&self, row: &Row) -> Result<f64> {
        let logits = self.encoder.encode(row).dot(&self.weights) + &self.bias;

        // Strict comparison keeps the lowest code on ties
        let mut best = 0;
        for (k, &z) in logits.iter().enumerate().skip(1) {
            if z > logits[best] {
                best = k;
            }
        }
        Ok(best as f64)
    }
}
