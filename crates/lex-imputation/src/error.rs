//! Custom error types for iterative imputation.
//!
//! This module provides the error hierarchy used across the crate, built with
//! `thiserror`. Errors are serializable so hosts can forward them as
//! `{ code, message }` objects (e.g. to a UI or a JSON report).

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for imputation.
#[derive(Error, Debug)]
pub enum ImputationError {
    /// Imputation was cancelled through a cancellation token.
    #[error("Imputation cancelled")]
    Cancelled,

    /// A row was supplied before any dataset structure was established.
    #[error("No input instance format defined")]
    NoSchema,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A learner specification could not be resolved.
    #[error("Invalid learner specification '{0}'")]
    InvalidLearner(String),

    /// A learner was configured for an attribute kind it cannot model.
    #[error("Learner '{learner}' cannot predict {kind} attributes")]
    IncompatibleLearner { learner: String, kind: String },

    /// Attribute was not found in the schema.
    #[error("Attribute '{0}' not found in dataset")]
    AttributeNotFound(String),

    /// A row does not match the dataset structure.
    #[error("Row has {actual} cells but the dataset defines {expected} attributes")]
    SchemaMismatch { expected: usize, actual: usize },

    /// A cell value is not valid for its attribute.
    #[error("Invalid value for attribute '{attribute}': {reason}")]
    InvalidValue { attribute: String, reason: String },

    /// A DataFrame column has a type that cannot become an attribute.
    #[error("Column '{column}' has unsupported type {dtype}")]
    UnsupportedColumnType { column: String, dtype: String },

    /// A predictor failed to fit or predict.
    #[error("Predictor for attribute '{attribute}' failed: {reason}")]
    PredictorFailed { attribute: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ImputationError>,
    },
}

impl ImputationError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ImputationError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a predictor failure on a named attribute.
    pub fn predictor(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        ImputationError::PredictorFailed {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Get a stable error code for host-side handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::NoSchema => "NO_SCHEMA",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidLearner(_) => "INVALID_LEARNER",
            Self::IncompatibleLearner { .. } => "INCOMPATIBLE_LEARNER",
            Self::AttributeNotFound(_) => "ATTRIBUTE_NOT_FOUND",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::UnsupportedColumnType { .. } => "UNSUPPORTED_COLUMN_TYPE",
            Self::PredictorFailed { .. } => "PREDICTOR_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Check if this error is a configuration error.
    ///
    /// Configuration errors are fatal for the current setup and are never
    /// worth retrying without changing the configuration first.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::NoSchema
            | Self::InvalidConfig(_)
            | Self::InvalidLearner(_)
            | Self::IncompatibleLearner { .. } => true,
            Self::WithContext { source, .. } => source.is_configuration_error(),
            _ => false,
        }
    }
}

impl From<crate::config::ConfigValidationError> for ImputationError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        ImputationError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ImputationError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ImputationError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for imputation operations.
pub type Result<T> = std::result::Result<T, ImputationError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ImputationError::Polars(e).with_context(context))
    }
}
