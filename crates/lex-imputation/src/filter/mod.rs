//! Two-phase streaming adapter around [`IterativeImputer`].
//!
//! The filter first buffers a training batch. When the batch is finished it
//! runs the imputer once, queues the completed training rows, and keeps the
//! trained models. Every row that arrives afterwards is imputed immediately
//! with those frozen models.
//!
//! ```rust,ignore
//! let mut filter = ImputationFilter::new(ImputerConfig::default())?;
//! filter.set_schema(schema);
//! for row in training_rows {
//!     filter.input(row)?;
//! }
//! filter.batch_finished()?;
//! let completed = filter.drain_output();
//!
//! filter.input(new_row)?;
//! let imputed = filter.output();
//! ```

use crate::config::ImputerConfig;
use crate::dataset::{Dataset, Row, Schema};
use crate::error::{ImputationError, Result};
use crate::imputer::{AttributeModels, IterativeImputer};
use crate::learners::Learners;
use crate::progress::{CancellationToken, ImputationStage, ProgressUpdate};
use crate::types::ImputationReport;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the filter is in its lifecycle.
#[derive(Debug)]
pub enum FilterPhase {
    /// Collecting the training batch.
    Buffering { buffer: Vec<Row> },
    /// Training is done; incoming rows are imputed with `models`.
    Applying { models: AttributeModels },
}

impl FilterPhase {
    fn buffering() -> Self {
        Self::Buffering { buffer: Vec::new() }
    }

    pub fn is_buffering(&self) -> bool {
        matches!(self, Self::Buffering { .. })
    }

    pub fn is_applying(&self) -> bool {
        matches!(self, Self::Applying { .. })
    }
}

/// Streaming imputation filter.
#[derive(Debug)]
pub struct ImputationFilter {
    imputer: IterativeImputer,
    schema: Option<Arc<Schema>>,
    phase: FilterPhase,
    pending: VecDeque<Row>,
    new_batch: bool,
    last_report: Option<ImputationReport>,
}

static_assertions::assert_impl_all!(ImputationFilter: Send, Sync);

impl ImputationFilter {
    /// A filter using the learners named by `config`.
    pub fn new(config: ImputerConfig) -> Result<Self> {
        Ok(Self::with_imputer(IterativeImputer::from_config(&config)?))
    }

    /// A filter using explicit learners.
    pub fn with_learners(config: ImputerConfig, learners: Learners) -> Result<Self> {
        Ok(Self::with_imputer(IterativeImputer::new(config, learners)?))
    }

    /// A filter around a pre-built imputer (with its progress reporter and
    /// cancellation token).
    pub fn with_imputer(imputer: IterativeImputer) -> Self {
        Self {
            imputer,
            schema: None,
            phase: FilterPhase::buffering(),
            pending: VecDeque::new(),
            new_batch: true,
            last_report: None,
        }
    }

    pub fn config(&self) -> &ImputerConfig {
        self.imputer.config()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        self.imputer.cancellation_token()
    }

    /// Establish the row structure. Discards any buffered rows, trained
    /// models and pending output.
    pub fn set_schema(&mut self, schema: impl Into<Arc<Schema>>) {
        let schema = schema.into();
        debug!("Filter schema set: {} attributes", schema.len());
        self.schema = Some(schema);
        self.reset();
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    /// Back to buffering with the current schema.
    pub fn reset(&mut self) {
        self.phase = FilterPhase::buffering();
        self.pending.clear();
        self.new_batch = true;
        self.last_report = None;
    }

    pub fn phase(&self) -> &FilterPhase {
        &self.phase
    }

    /// Whether the training batch has been processed.
    pub fn is_first_batch_done(&self) -> bool {
        self.phase.is_applying()
    }

    /// Trained models, once the first batch is done.
    pub fn models(&self) -> Option<&AttributeModels> {
        match &self.phase {
            FilterPhase::Applying { models } => Some(models),
            FilterPhase::Buffering { .. } => None,
        }
    }

    /// Report from the training run, once the first batch is done.
    pub fn last_report(&self) -> Option<&ImputationReport> {
        self.last_report.as_ref()
    }

    fn require_schema(&self) -> Result<&Arc<Schema>> {
        self.schema.as_ref().ok_or(ImputationError::NoSchema)
    }

    /// Feed one row.
    ///
    /// While buffering the row is kept for training and `false` is returned.
    /// Afterwards the row is imputed, queued for [`output`](Self::output),
    /// and `true` is returned. The first input after a finished batch drops
    /// any output that was not collected.
    pub fn input(&mut self, row: Row) -> Result<bool> {
        self.require_schema()?.validate_row(&row)?;

        if self.new_batch {
            self.pending.clear();
            self.new_batch = false;
        }

        if let FilterPhase::Buffering { buffer } = &mut self.phase {
            buffer.push(row);
            return Ok(false);
        }

        let mut row = row;
        self.impute_row(&mut row)?;
        self.pending.push_back(row);
        Ok(true)
    }

    /// Signal the end of a batch.
    ///
    /// The first call trains on the buffered rows and queues them, completed,
    /// in arrival order. Returns whether output is pending. If training fails
    /// the buffered rows are lost and the filter stays in buffering.
    pub fn batch_finished(&mut self) -> Result<bool> {
        let schema = self.require_schema()?.clone();

        if let FilterPhase::Buffering { buffer } = &mut self.phase {
            let rows = std::mem::take(buffer);
            info!("Training batch finished with {} rows", rows.len());

            let dataset = Dataset::with_rows(schema, rows)?;
            let outcome = self.imputer.run(dataset)?;

            self.pending.extend(outcome.dataset.into_rows());
            self.last_report = Some(outcome.report);
            self.phase = FilterPhase::Applying {
                models: outcome.models,
            };
            self.imputer.report_progress(ProgressUpdate::new(
                ImputationStage::Applying,
                0.0,
                "Models frozen; imputing incoming rows",
            ));
        }

        self.new_batch = true;
        Ok(!self.pending.is_empty())
    }

    /// Impute a row with the trained models without touching the queue.
    ///
    /// Returns the number of cells filled. Before training finishes, or with
    /// `impute_at_apply_time` disabled, nothing is filled.
    pub fn impute_row(&self, row: &mut Row) -> Result<usize> {
        self.require_schema()?.validate_row(row)?;
        if !self.imputer.config().impute_at_apply_time {
            return Ok(0);
        }
        match &self.phase {
            FilterPhase::Applying { models } => models.impute_row(row),
            FilterPhase::Buffering { .. } => Ok(0),
        }
    }

    /// Next completed row, if any.
    pub fn output(&mut self) -> Option<Row> {
        self.pending.pop_front()
    }

    /// All completed rows, in order.
    pub fn drain_output(&mut self) -> Vec<Row> {
        self.pending.drain(..).collect()
    }

    pub fn num_pending_output(&self) -> usize {
        self.pending.len()
    }

    /// Run a whole dataset through the filter as a single training batch.
    ///
    /// The filter is left in the applying phase, ready for further rows.
    pub fn filter_dataset(&mut self, dataset: Dataset) -> Result<Dataset> {
        let schema = dataset.schema_arc().clone();
        self.set_schema(schema.clone());
        for row in dataset.into_rows() {
            self.input(row)?;
        }
        self.batch_finished()?;
        Dataset::with_rows(schema, self.drain_output())
    }
}
