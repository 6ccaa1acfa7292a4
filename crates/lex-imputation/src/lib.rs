//! Iterative Regression-based Missing-value Imputation
//!
//! A library for filling missing cells in tabular data by repeatedly
//! regressing each incomplete attribute on all the others, built with Rust
//! and Polars.
//!
//! # Overview
//!
//! - **Ranking**: attributes are processed from most to least missing
//! - **Seeding**: missing cells start at the column median (numeric) or mode (nominal)
//! - **Refinement**: each attribute is refit until its predictions stop moving
//!   by more than `epsilon`, or the epoch limit is reached
//! - **Streaming**: [`ImputationFilter`] trains on a first batch, then imputes
//!   every later row with the frozen models
//! - **Pluggable learners**: any type implementing [`Learner`] can be used for
//!   the numeric or nominal slot
//! - **Progress Reporting**: per-attribute progress updates with cancellation support
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_imputation::{Dataset, ImputerConfig, IterativeImputer};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("data.csv".into()))?
//!     .finish()?;
//! let dataset = Dataset::from_dataframe(&df, Some("class"))?;
//!
//! let config = ImputerConfig::builder()
//!     .max_epochs(50)
//!     .epsilon(1.0)
//!     .build()?;
//!
//! let outcome = IterativeImputer::from_config(&config)?
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .run(dataset)?;
//!
//! println!("converged: {}", outcome.report.converged);
//! let completed = outcome.dataset.to_dataframe()?;
//! ```
//!
//! # Streaming
//!
//! ```rust,ignore
//! use lex_imputation::{ImputationFilter, ImputerConfig};
//!
//! let mut filter = ImputationFilter::new(ImputerConfig::default())?;
//! filter.set_schema(schema);
//! for row in training_rows {
//!     filter.input(row)?;
//! }
//! filter.batch_finished()?;
//! let training_output = filter.drain_output();
//!
//! // Rows arriving after the first batch are imputed on input
//! filter.input(new_row)?;
//! let imputed = filter.output();
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod imputer;
pub mod learners;
pub mod progress;
pub mod statistics;
pub mod types;

// Re-exports for convenient access
pub use config::{ConfigValidationError, ImputerConfig, ImputerConfigBuilder};
pub use dataset::{Attribute, AttributeKind, Dataset, MISSING, Row, Schema, is_missing};
pub use error::{ImputationError, Result as ImputationResult, ResultExt};
pub use filter::{FilterPhase, ImputationFilter};
pub use imputer::{AttributeModels, ImputationOutcome, IterativeImputer, rank_by_missingness};
pub use learners::{
    FeatureEncoder, Learner, LearnerKind, Learners, LinearRegressionLearner,
    LogisticRegressionLearner, MajorityLearner, NearestNeighborLearner, NominalEncoding, Predictor,
};
pub use progress::{
    CancellationToken, ClosureProgressReporter, ImputationStage, ProgressReporter, ProgressUpdate,
};
pub use types::{AttributeReport, ImputationReport, SkipReason};
