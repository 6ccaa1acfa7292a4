//! Configuration types for iterative imputation.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic imputer setup.

use crate::error::Result;
use crate::learners::LearnerKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for [`IterativeImputer`](crate::IterativeImputer) and
/// [`ImputationFilter`](crate::ImputationFilter).
///
/// Use [`ImputerConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_imputation::{ImputerConfig, LearnerKind};
///
/// let config = ImputerConfig::builder()
///     .max_epochs(20)
///     .epsilon(0.5)
///     .numeric_learner(LearnerKind::NearestNeighbor)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputerConfig {
    /// Maximum number of passes over the ranked attributes.
    /// Default: 100
    pub max_epochs: usize,

    /// Sum-of-squared-changes threshold below which an attribute is
    /// considered stable and is no longer refit.
    /// Default: 5.0
    pub epsilon: f64,

    /// Whether rows arriving after training are imputed with the trained
    /// models. When false they pass through unchanged.
    /// Default: true
    pub impute_at_apply_time: bool,

    /// Learner used for numeric attributes.
    /// Default: linear regression
    pub numeric_learner: LearnerKind,

    /// Learner used for nominal attributes.
    /// Default: logistic regression
    pub nominal_learner: LearnerKind,

    /// Whether missing target cells are seeded with the median/mode before
    /// fitting. When false they stay missing and learners fall back to their
    /// own substitution.
    /// Default: true
    pub seed_target: bool,

    /// Number of neighbours for the nearest-neighbour learner.
    /// Default: 1
    pub knn_neighbors: usize,
}

impl Default for ImputerConfig {
    fn default() -> Self {
        Self {
            max_epochs: 100,
            epsilon: 5.0,
            impute_at_apply_time: true,
            numeric_learner: LearnerKind::LinearRegression,
            nominal_learner: LearnerKind::LogisticRegression,
            seed_target: true,
            knn_neighbors: 1,
        }
    }
}

impl ImputerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ImputerConfigBuilder {
        ImputerConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ConfigValidationError::InvalidEpsilon(self.epsilon));
        }

        if self.knn_neighbors == 0 {
            return Err(ConfigValidationError::InvalidKnnNeighbors(
                self.knn_neighbors,
            ));
        }

        if !self.numeric_learner.supports_numeric() {
            return Err(ConfigValidationError::IncompatibleLearner {
                slot: "numeric",
                learner: self.numeric_learner,
            });
        }

        if !self.nominal_learner.supports_nominal() {
            return Err(ConfigValidationError::IncompatibleLearner {
                slot: "nominal",
                learner: self.nominal_learner,
            });
        }

        Ok(())
    }

    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid epsilon: {0} (must be finite and non-negative)")]
    InvalidEpsilon(f64),

    #[error("Invalid KNN neighbors: {0} (must be at least 1)")]
    InvalidKnnNeighbors(usize),

    #[error("Learner '{learner}' cannot be used for {slot} attributes")]
    IncompatibleLearner {
        slot: &'static str,
        learner: LearnerKind,
    },
}

/// Builder for [`ImputerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ImputerConfigBuilder {
    max_epochs: Option<usize>,
    epsilon: Option<f64>,
    impute_at_apply_time: Option<bool>,
    numeric_learner: Option<LearnerKind>,
    nominal_learner: Option<LearnerKind>,
    seed_target: Option<bool>,
    knn_neighbors: Option<usize>,
}

impl ImputerConfigBuilder {
    /// Set the maximum number of epochs.
    pub fn max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = Some(epochs);
        self
    }

    /// Set the convergence threshold on the per-attribute sum of squared changes.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    /// Enable or disable imputation of rows arriving after training.
    pub fn impute_at_apply_time(mut self, enable: bool) -> Self {
        self.impute_at_apply_time = Some(enable);
        self
    }

    pub fn numeric_learner(mut self, learner: LearnerKind) -> Self {
        self.numeric_learner = Some(learner);
        self
    }

    pub fn nominal_learner(mut self, learner: LearnerKind) -> Self {
        self.nominal_learner = Some(learner);
        self
    }

    /// Enable or disable seeding of missing target cells.
    pub fn seed_target(mut self, seed: bool) -> Self {
        self.seed_target = Some(seed);
        self
    }

    /// Set the number of neighbors for the nearest-neighbour learner.
    pub fn knn_neighbors(mut self, k: usize) -> Self {
        self.knn_neighbors = Some(k);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ImputerConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<ImputerConfig, ConfigValidationError> {
        let defaults = ImputerConfig::default();
        let config = ImputerConfig {
            max_epochs: self.max_epochs.unwrap_or(defaults.max_epochs),
            epsilon: self.epsilon.unwrap_or(defaults.epsilon),
            impute_at_apply_time: self
                .impute_at_apply_time
                .unwrap_or(defaults.impute_at_apply_time),
            numeric_learner: self.numeric_learner.unwrap_or(defaults.numeric_learner),
            nominal_learner: self.nominal_learner.unwrap_or(defaults.nominal_learner),
            seed_target: self.seed_target.unwrap_or(defaults.seed_target),
            knn_neighbors: self.knn_neighbors.unwrap_or(defaults.knn_neighbors),
        };

        config.validate()?;
        Ok(config)
    }
}
