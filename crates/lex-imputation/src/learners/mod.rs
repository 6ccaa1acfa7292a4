//! Trainable predictor capability consumed by the imputer.
//!
//! The imputer only needs two things from a model:
//!
//! - a [`Learner`] that fits on the observed rows of one attribute, and
//! - the resulting [`Predictor`] that maps a row to a value for that attribute.
//!
//! Which learner is used depends on the kind of the attribute being imputed;
//! [`Learners`] holds one learner per kind. The built-in learners cover the
//! usual choices:
//!
//! | Kind                               | Numeric | Nominal |
//! |------------------------------------|---------|---------|
//! | [`LinearRegressionLearner`]        | yes     | no      |
//! | [`LogisticRegressionLearner`]      | no      | yes     |
//! | [`NearestNeighborLearner`]         | yes     | yes     |
//! | [`MajorityLearner`]                | yes     | yes     |
//!
//! Custom models plug in by implementing [`Learner`].

mod encoding;
mod linear;
mod logistic;
mod majority;
mod nearest;

pub use encoding::{FeatureEncoder, NominalEncoding};
pub use linear::LinearRegressionLearner;
pub use logistic::LogisticRegressionLearner;
pub use majority::MajorityLearner;
pub use nearest::NearestNeighborLearner;

use crate::config::ImputerConfig;
use crate::dataset::{AttributeKind, Row, Schema};
use crate::error::{ImputationError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A fitted model for one dependent attribute.
pub trait Predictor: Send + Sync + fmt::Debug {
    /// Predict the dependent attribute's value for `row`.
    ///
    /// The row's own cell for the dependent attribute is ignored. For nominal
    /// attributes the returned value is a label code.
    fn predict(&self, row: &Row) -> Result<f64>;
}

/// Something that can fit a [`Predictor`].
pub trait Learner: Send + Sync + fmt::Debug {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Whether this learner can model attributes of the given kind.
    fn supports(&self, kind: &AttributeKind) -> bool;

    /// Fit a predictor for `dependent` using every other attribute of `rows`.
    ///
    /// Rows whose dependent cell is missing or non-finite are not used.
    fn fit(&self, schema: &Schema, rows: &[&Row], dependent: usize) -> Result<Box<dyn Predictor>>;
}

static_assertions::assert_obj_safe!(Learner, Predictor);

/// Built-in learner selection, as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerKind {
    /// Least squares with a small ridge term
    #[serde(alias = "linear")]
    LinearRegression,
    /// Multinomial (softmax) logistic regression
    #[serde(alias = "logistic")]
    LogisticRegression,
    /// k-nearest-neighbour vote / average
    #[serde(alias = "knn")]
    NearestNeighbor,
    /// Mean or mode of the observed values
    Majority,
}

impl LearnerKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LinearRegression => "linear_regression",
            Self::LogisticRegression => "logistic_regression",
            Self::NearestNeighbor => "nearest_neighbor",
            Self::Majority => "majority",
        }
    }

    pub fn supports_numeric(&self) -> bool {
        !matches!(self, Self::LogisticRegression)
    }

    pub fn supports_nominal(&self) -> bool {
        !matches!(self, Self::LinearRegression)
    }

    /// Instantiate the learner.
    pub fn build(&self, knn_neighbors: usize) -> Arc<dyn Learner> {
        match self {
            Self::LinearRegression => Arc::new(LinearRegressionLearner::default()),
            Self::LogisticRegression => Arc::new(LogisticRegressionLearner::default()),
            Self::NearestNeighbor => Arc::new(NearestNeighborLearner::new(knn_neighbors)),
            Self::Majority => Arc::new(MajorityLearner),
        }
    }
}

impl fmt::Display for LearnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LearnerKind {
    type Err = ImputationError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "linear" | "linear_regression" => Ok(Self::LinearRegression),
            "logistic" | "logistic_regression" => Ok(Self::LogisticRegression),
            "knn" | "nearest_neighbor" | "nearest_neighbour" => Ok(Self::NearestNeighbor),
            "majority" | "zero_r" | "zeror" => Ok(Self::Majority),
            _ => Err(ImputationError::InvalidLearner(s.to_string())),
        }
    }
}

/// One learner per attribute kind.
#[derive(Debug, Clone)]
pub struct Learners {
    numeric: Arc<dyn Learner>,
    nominal: Arc<dyn Learner>,
}

static_assertions::assert_impl_all!(Learners: Send, Sync);

impl Learners {
    /// Pair a numeric and a nominal learner, checking each supports its slot.
    pub fn new(numeric: Arc<dyn Learner>, nominal: Arc<dyn Learner>) -> Result<Self> {
        if !numeric.supports(&AttributeKind::Numeric) {
            return Err(ImputationError::IncompatibleLearner {
                learner: numeric.name().to_string(),
                kind: "numeric".to_string(),
            });
        }
        let any_nominal = AttributeKind::Nominal { values: Vec::new() };
        if !nominal.supports(&any_nominal) {
            return Err(ImputationError::IncompatibleLearner {
                learner: nominal.name().to_string(),
                kind: "nominal".to_string(),
            });
        }
        Ok(Self { numeric, nominal })
    }

    /// The learners named by a configuration.
    pub fn from_config(config: &ImputerConfig) -> Result<Self> {
        Self::new(
            config.numeric_learner.build(config.knn_neighbors),
            config.nominal_learner.build(config.knn_neighbors),
        )
    }

    /// Learner responsible for attributes of `kind`.
    pub fn for_kind(&self, kind: &AttributeKind) -> &dyn Learner {
        match kind {
            AttributeKind::Numeric => self.numeric.as_ref(),
            AttributeKind::Nominal { .. } => self.nominal.as_ref(),
        }
    }

    pub fn numeric(&self) -> &Arc<dyn Learner> {
        &self.numeric
    }

    pub fn nominal(&self) -> &Arc<dyn Learner> {
        &self.nominal
    }
}

impl Default for Learners {
    fn default() -> Self {
        Self {
            numeric: Arc::new(LinearRegressionLearner::default()),
            nominal: Arc::new(LogisticRegressionLearner::default()),
        }
    }
}

/// Collect the usable training pairs for `dependent`.
///
/// Returns the rows together with their dependent values, skipping rows whose
/// dependent cell is missing or non-finite. Fails when nothing is left.
pub(crate) fn training_targets<'a>(
    schema: &Schema,
    rows: &[&'a Row],
    dependent: usize,
) -> Result<(Vec<&'a Row>, Vec<f64>)> {
    let (kept, targets): (Vec<&Row>, Vec<f64>) = rows
        .iter()
        .filter(|row| row.value(dependent).is_finite())
        .map(|row| (*row, row.value(dependent)))
        .unzip();

    if kept.is_empty() {
        return Err(ImputationError::predictor(
            schema.attribute(dependent).name(),
            "no observed rows to train on",
        ));
    }
    Ok((kept, targets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learner_kind_from_str() {
        assert_eq!("linear".parse::<LearnerKind>().unwrap(), LearnerKind::LinearRegression);
        assert_eq!(
            "Logistic-Regression".parse::<LearnerKind>().unwrap(),
            LearnerKind::LogisticRegression
        );
        assert_eq!("knn".parse::<LearnerKind>().unwrap(), LearnerKind::NearestNeighbor);
        assert_eq!("ZeroR".parse::<LearnerKind>().unwrap(), LearnerKind::Majority);
    }

    #[test]
    fn test_learner_kind_from_str_invalid() {
        let err = "random_forest".parse::<LearnerKind>().unwrap_err();
        assert!(matches!(err, ImputationError::InvalidLearner(ref s) if s == "random_forest"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_learner_kind_support_matrix() {
        assert!(LearnerKind::LinearRegression.supports_numeric());
        assert!(!LearnerKind::LinearRegression.supports_nominal());
        assert!(!LearnerKind::LogisticRegression.supports_numeric());
        assert!(LearnerKind::LogisticRegression.supports_nominal());
        assert!(LearnerKind::NearestNeighbor.supports_numeric());
        assert!(LearnerKind::Majority.supports_nominal());
    }

    #[test]
    fn test_learner_kind_json_values() {
        assert_eq!(
            serde_json::to_string(&LearnerKind::NearestNeighbor).unwrap(),
            "\"nearest_neighbor\""
        );
        let kind: LearnerKind = serde_json::from_str("\"majority\"").unwrap();
        assert_eq!(kind, LearnerKind::Majority);
        let kind: LearnerKind = serde_json::from_str("\"knn\"").unwrap();
        assert_eq!(kind, LearnerKind::NearestNeighbor);
    }

    #[test]
    fn test_learners_rejects_swapped_slots() {
        let result = Learners::new(
            Arc::new(LogisticRegressionLearner::default()),
            Arc::new(LinearRegressionLearner::default()),
        );
        assert!(matches!(
            result,
            Err(ImputationError::IncompatibleLearner { ref kind, .. }) if kind == "numeric"
        ));
    }

    #[test]
    fn test_learners_for_kind() {
        let learners = Learners::default();
        assert_eq!(learners.for_kind(&AttributeKind::Numeric).name(), "linear_regression");
        let nominal = AttributeKind::Nominal {
            values: vec!["a".to_string()],
        };
        assert_eq!(learners.for_kind(&nominal).name(), "logistic_regression");
    }
}
