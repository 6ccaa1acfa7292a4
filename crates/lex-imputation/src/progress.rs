//! Progress reporting and cancellation for imputation runs.
//!
//! A run can take a while on wide datasets: every epoch refits one model per
//! incomplete attribute. Hosts observe it through a [`ProgressReporter`] and
//! stop it through a [`CancellationToken`] shared with another thread.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_imputation::{CancellationToken, ImputerConfig, IterativeImputer};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     token_clone.cancel();
//! });
//!
//! let outcome = IterativeImputer::from_config(&ImputerConfig::default())?
//!     .with_cancellation(token)
//!     .on_progress(|update| println!("[{:?}] {}", update.stage, update.message))
//!     .run(dataset);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Phases of an imputation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStage {
    /// Counting missing cells and ordering attributes
    Ranking,
    /// Filling missing cells with median / mode starting values
    Seeding,
    /// Epoch loop: fitting one model per incomplete attribute
    Fitting,
    /// Imputing rows with the trained models
    Applying,
    /// Run completed successfully
    Complete,
    /// Run was cancelled through its token
    Cancelled,
    /// Run failed with an error
    Failed,
}

impl ImputationStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ranking => "Ranking Attributes",
            Self::Seeding => "Seeding Missing Values",
            Self::Fitting => "Fitting Models",
            Self::Applying => "Applying Models",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run attributed to this stage.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Ranking => 0.02,
            Self::Seeding => 0.03,
            Self::Fitting => 0.85,
            Self::Applying => 0.10,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    /// Overall progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Ranking => 0.0,
            Self::Seeding => 0.02,
            Self::Fitting => 0.05,
            Self::Applying => 0.90,
            Self::Complete => 1.0,
            Self::Cancelled | Self::Failed => 0.0,
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: ImputationStage,

    /// Attribute being fitted, when the update concerns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    /// 1-based epoch number during fitting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<usize>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    pub fn new(stage: ImputationStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            attribute: None,
            epoch: None,
            progress: (stage.base_progress() + stage.weight() * stage_progress).clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Update for the model fitted for `attribute` in `epoch`.
    ///
    /// Fitting progress is measured in epochs out of `max_epochs`; a run that
    /// converges early jumps straight to completion.
    pub fn fitted(
        attribute: impl Into<String>,
        epoch: usize,
        max_epochs: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if max_epochs > 0 {
            epoch as f32 / max_epochs as f32
        } else {
            1.0
        };
        Self {
            attribute: Some(attribute.into()),
            epoch: Some(epoch),
            ..Self::new(ImputationStage::Fitting, stage_progress, message)
        }
    }

    /// Update with item counts, e.g. rows imputed so far.
    pub fn with_items(
        stage: ImputationStage,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            progress: 1.0,
            stage_progress: 1.0,
            ..Self::new(ImputationStage::Complete, 1.0, message)
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ImputationStage::Cancelled, 0.0, "Imputation cancelled by user")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ImputationStage::Failed, 0.0, message)
    }
}

/// Receives progress updates during imputation.
///
/// Implementations must be `Send + Sync` so a run on a background thread can
/// report to a UI thread. `report` is called once per fitted model, so it
/// should return quickly.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running imputation.
///
/// Cloning shares the flag, so [`cancel()`](Self::cancel) on any clone is
/// seen by the run holding another. The imputer checks the token before each
/// model fit and returns
/// [`ImputationError::Cancelled`](crate::error::ImputationError::Cancelled).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can serve another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}
