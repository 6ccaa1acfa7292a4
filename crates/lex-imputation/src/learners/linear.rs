//! Least-squares linear regression for numeric attributes.

use super::encoding::{FeatureEncoder, NominalEncoding};
use super::{Learner, Predictor, training_targets};
use crate::dataset::{AttributeKind, Row, Schema};
use crate::error::{ImputationError, Result};
use ndarray::{Array1, Array2, s};

/// Ordinary least squares with a small ridge term on the slopes.
///
/// Solves the normal equations with a Cholesky factorisation and falls back
/// to Gauss-Jordan elimination when the system is not positive definite.
#[derive(Debug, Clone)]
pub struct LinearRegressionLearner {
    ridge: f64,
}

impl LinearRegressionLearner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ridge added to the diagonal of the slope terms.
    pub fn with_ridge(mut self, ridge: f64) -> Self {
        self.ridge = ridge.max(0.0);
        self
    }
}

impl Default for LinearRegressionLearner {
    fn default() -> Self {
        Self { ridge: 1e-8 }
    }
}

impl Learner for LinearRegressionLearner {
    fn name(&self) -> &str {
        "linear_regression"
    }

    fn supports(&self, kind: &AttributeKind) -> bool {
        kind.is_numeric()
    }

    fn fit(&self, schema: &Schema, rows: &[&Row], dependent: usize) -> Result<Box<dyn Predictor>> {
        let (rows, targets) = training_targets(schema, rows, dependent)?;
        let encoder = FeatureEncoder::fit(schema, &rows, dependent, NominalEncoding::DropFirst);

        // Design matrix [1, x_1 .. x_p]
        let mut design = Array2::ones((rows.len(), encoder.width() + 1));
        design
            .slice_mut(s![.., 1..])
            .assign(&encoder.encode_rows(&rows));
        let y = Array1::from(targets);

        let mut xtx = design.t().dot(&design);
        let xty = design.t().dot(&y);
        for i in 1..xtx.nrows() {
            xtx[[i, i]] += self.ridge;
        }

        let coefficients = cholesky_solve(&xtx, &xty)
            .or_else(|| gauss_jordan_solve(&xtx, &xty))
            .filter(|c| c.iter().all(|v| v.is_finite()))
            .ok_or_else(|| {
                ImputationError::predictor(
                    schema.attribute(dependent).name(),
                    "singular design matrix",
                )
            })?;

        Ok(Box::new(LinearModel {
            encoder,
            intercept: coefficients[0],
            slopes: coefficients.slice(s![1..]).to_owned(),
        }))
    }
}

#[derive(Debug)]
struct LinearModel {
    encoder: FeatureEncoder,
    intercept: f64,
    slopes: Array1<f64>,
}

impl Predictor for LinearModel {
    fn predict(&self, row: &Row) -> Result<f64> {
        Ok(self.intercept + self.encoder.encode(row).dot(&self.slopes))
    }
}

/// Solve `A x = b` for symmetric positive-definite `A`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, i]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    Some(x)
}

/// Gauss-Jordan elimination with partial pivoting on `[A | b]`.
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let mut aug = Array2::<f64>::zeros((n, n + 1));
    aug.slice_mut(s![.., ..n]).assign(a);
    aug.column_mut(n).assign(b);

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| {
            aug[[r1, col]].abs().total_cmp(&aug[[r2, col]].abs())
        })?;
        if aug[[pivot_row, col]].abs() < 1e-12 {
            return None;
        }
        if pivot_row != col {
            for j in 0..=n {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        aug.row_mut(col).mapv_inplace(|v| v / pivot);
        let pivot_values = aug.row(col).to_owned();
        for row in (0..n).filter(|&r| r != col) {
            let factor = aug[[row, col]];
            if factor != 0.0 {
                aug.row_mut(row).scaled_add(-factor, &pivot_values);
            }
        }
    }

    Some(aug.column(n).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Attribute, MISSING};
    use ndarray::array;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_recovers_exact_linear_relationship() {
        let schema = Schema::new(
            vec![Attribute::numeric("a"), Attribute::numeric("b"), Attribute::numeric("y")],
            2,
        )
        .unwrap();
        // y = 2a - b + 3
        let rows: Vec<Row> = [(1.0, 0.0), (2.0, 1.0), (3.0, 5.0), (0.0, 2.0), (4.0, 4.0)]
            .iter()
            .map(|&(a, b)| Row::new(vec![a, b, 2.0 * a - b + 3.0]))
            .collect();
        let refs: Vec<&Row> = rows.iter().collect();

        let model = LinearRegressionLearner::new().fit(&schema, &refs, 2).unwrap();
        assert_close(model.predict(&Row::new(vec![10.0, 1.0, MISSING])).unwrap(), 22.0);
    }

    #[test]
    fn test_nominal_predictor_uses_dummy_coding() {
        let schema = Schema::new(
            vec![Attribute::nominal("group", ["a", "b"]), Attribute::numeric("y")],
            0,
        )
        .unwrap();
        let rows = vec![
            Row::new(vec![0.0, 1.0]),
            Row::new(vec![0.0, 3.0]),
            Row::new(vec![1.0, 10.0]),
            Row::new(vec![1.0, 12.0]),
        ];
        let refs: Vec<&Row> = rows.iter().collect();

        let model = LinearRegressionLearner::new().fit(&schema, &refs, 1).unwrap();
        assert_close(model.predict(&Row::new(vec![0.0, MISSING])).unwrap(), 2.0);
        assert_close(model.predict(&Row::new(vec![1.0, MISSING])).unwrap(), 11.0);
    }

    #[test]
    fn test_ignores_rows_with_missing_dependent() {
        let schema = Schema::new(vec![Attribute::numeric("x"), Attribute::numeric("y")], 0).unwrap();
        let rows = vec![
            Row::new(vec![1.0, 2.0]),
            Row::new(vec![2.0, 4.0]),
            Row::new(vec![3.0, MISSING]),
        ];
        let refs: Vec<&Row> = rows.iter().collect();

        let model = LinearRegressionLearner::new().fit(&schema, &refs, 1).unwrap();
        assert_close(model.predict(&Row::new(vec![3.0, MISSING])).unwrap(), 6.0);
    }

    #[test]
    fn test_no_usable_rows_fails() {
        let schema = Schema::new(vec![Attribute::numeric("x"), Attribute::numeric("y")], 0).unwrap();
        let rows = vec![Row::new(vec![1.0, MISSING])];
        let refs: Vec<&Row> = rows.iter().collect();

        let err = LinearRegressionLearner::new().fit(&schema, &refs, 1).unwrap_err();
        assert!(matches!(err, ImputationError::PredictorFailed { ref attribute, .. } if attribute == "y"));
    }

    #[test]
    fn test_singular_system_without_ridge_fails() {
        let schema = Schema::new(vec![Attribute::numeric("x"), Attribute::numeric("y")], 0).unwrap();
        // Constant feature with no ridge leaves a zero row in the normal equations
        let rows = vec![Row::new(vec![5.0, 1.0]), Row::new(vec![5.0, 2.0])];
        let refs: Vec<&Row> = rows.iter().collect();

        let err = LinearRegressionLearner::new()
            .with_ridge(0.0)
            .fit(&schema, &refs, 1)
            .unwrap_err();
        assert!(matches!(err, ImputationError::PredictorFailed { .. }));
    }

    #[test]
    fn test_constant_feature_with_ridge_predicts_mean() {
        let schema = Schema::new(vec![Attribute::numeric("x"), Attribute::numeric("y")], 0).unwrap();
        let rows = vec![Row::new(vec![5.0, 1.0]), Row::new(vec![5.0, 3.0])];
        let refs: Vec<&Row> = rows.iter().collect();

        let model = LinearRegressionLearner::new().fit(&schema, &refs, 1).unwrap();
        assert_close(model.predict(&Row::new(vec![5.0, MISSING])).unwrap(), 2.0);
    }

    #[test]
    fn test_gauss_jordan_handles_indefinite_system() {
        // Symmetric but indefinite: Cholesky rejects it
        let a = array![[0.0, 1.0], [1.0, 0.0]];
        let b = array![2.0, 3.0];
        assert!(cholesky_solve(&a, &b).is_none());
        let x = gauss_jordan_solve(&a, &b).unwrap();
        assert_close(x[0], 3.0);
        assert_close(x[1], 2.0);
    }

    #[test]
    fn test_cholesky_and_gauss_jordan_agree_on_normal_equations() {
        let x = array![[1.0, 0.5], [1.0, 1.5], [1.0, 3.0], [1.0, 4.0]];
        let y = array![2.0, 4.0, 7.0, 9.0];
        let xtx = x.t().dot(&x);
        let xty = x.t().dot(&y);

        let via_cholesky = cholesky_solve(&xtx, &xty).unwrap();
        let via_elimination = gauss_jordan_solve(&xtx, &xty).unwrap();
        assert_close(via_cholesky[0], via_elimination[0]);
        assert_close(via_cholesky[1], via_elimination[1]);
        assert_close(via_cholesky[1], 2.0);
        assert_close(via_cholesky[0], 1.0);
    }

    #[test]
    fn test_solvers_reject_mismatched_shapes() {
        let a = array![[1.0, 0.0], [0.0, 1.0]];
        let b = array![1.0, 2.0, 3.0];
        assert!(cholesky_solve(&a, &b).is_none());
        assert!(gauss_jordan_solve(&a, &b).is_none());
    }
}
