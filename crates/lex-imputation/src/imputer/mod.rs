//! Iterative regression imputation.
//!
//! [`IterativeImputer`] runs the training-time algorithm over a whole
//! [`Dataset`](crate::Dataset) and hands back the completed rows together
//! with the per-attribute models in an [`AttributeModels`] registry, which
//! can then impute rows that arrive later.

mod orchestrator;
mod ranking;
mod registry;

pub use orchestrator::{ImputationOutcome, IterativeImputer};
pub use ranking::rank_by_missingness;
pub use registry::AttributeModels;
