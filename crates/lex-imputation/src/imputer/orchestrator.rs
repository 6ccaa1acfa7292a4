//! The epoch loop.

use super::ranking::rank_by_missingness;
use super::registry::AttributeModels;
use crate::config::ImputerConfig;
use crate::dataset::{Dataset, Row};
use crate::error::{ImputationError, Result};
use crate::learners::{Learners, Predictor};
use crate::progress::{
    CancellationToken, ClosureProgressReporter, ImputationStage, ProgressReporter, ProgressUpdate,
};
use crate::statistics;
use crate::types::{AttributeReport, ImputationReport, SkipReason};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Result of [`IterativeImputer::run`].
#[derive(Debug)]
pub struct ImputationOutcome {
    /// The input rows with their missing cells filled.
    pub dataset: Dataset,
    /// The last model fitted for each imputed attribute.
    pub models: AttributeModels,
    pub report: ImputationReport,
}

/// Row partition of one attribute by its original missingness.
#[derive(Debug, Default)]
struct Partition {
    observed: Vec<usize>,
    missing: Vec<usize>,
}

/// Bookkeeping for one attribute across epochs.
#[derive(Debug, Default)]
struct AttributeState {
    stable: bool,
    fits: usize,
    learner: Option<String>,
    stable_at_epoch: Option<usize>,
    last_change: Option<f64>,
}

/// Iterative regression imputation over a whole dataset.
///
/// Every attribute with missing cells gets a model fitted on the rows where it
/// was observed, using all other attributes as inputs, and its missing cells
/// are overwritten with predictions. Attributes are visited from most to
/// least missing, once per epoch, until the sum of squared changes of each
/// falls below `epsilon` or `max_epochs` is reached.
///
/// # Example
///
/// ```rust,ignore
/// use lex_imputation::{ImputerConfig, IterativeImputer};
///
/// let imputer = IterativeImputer::from_config(&ImputerConfig::default())?;
/// let outcome = imputer.run(dataset)?;
/// println!("converged: {}", outcome.report.converged);
/// ```
#[derive(Clone)]
pub struct IterativeImputer {
    config: ImputerConfig,
    learners: Learners,
    cancellation_token: CancellationToken,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(IterativeImputer: Send, Sync);

impl std::fmt::Debug for IterativeImputer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterativeImputer")
            .field("config", &self.config)
            .field("learners", &self.learners)
            .field("has_progress_reporter", &self.progress_reporter.is_some())
            .finish()
    }
}

impl IterativeImputer {
    /// Create an imputer with explicit learners.
    ///
    /// The configuration is validated; its learner kinds are ignored in favour
    /// of `learners`.
    pub fn new(config: ImputerConfig, learners: Learners) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            learners,
            cancellation_token: CancellationToken::new(),
            progress_reporter: None,
        })
    }

    /// Create an imputer using the learners named by the configuration.
    pub fn from_config(config: &ImputerConfig) -> Result<Self> {
        config.validate()?;
        let learners = Learners::from_config(config)?;
        Self::new(config.clone(), learners)
    }

    /// Use a cancellation token checked before every model fit.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Set a progress reporter.
    pub fn with_progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback.
    pub fn on_progress<F>(self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.with_progress(Arc::new(ClosureProgressReporter::new(callback)))
    }

    pub fn config(&self) -> &ImputerConfig {
        &self.config
    }

    pub fn learners(&self) -> &Learners {
        &self.learners
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// Impute every missing non-target cell of `dataset`.
    ///
    /// The epoch loop stops as soon as every fittable attribute (at least one
    /// missing and one observed cell) is stable. Complete attributes and
    /// attributes with no observed cells never hold the loop open, so
    /// `epochs_run` can be lower than a loop that waits on every attribute.
    /// The imputed values are the same either way.
    ///
    /// Returns `Err(ImputationError::Cancelled)` if the token was cancelled
    /// before a fit. A failing learner or predictor aborts the run.
    pub fn run(&self, dataset: Dataset) -> Result<ImputationOutcome> {
        match self.run_internal(dataset) {
            Ok(outcome) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Imputation finished after {} epoch(s)",
                    outcome.report.epochs_run
                )));
                Ok(outcome)
            }
            Err(e) => {
                if e.is_cancelled() {
                    warn!("Imputation cancelled");
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    error!("Imputation error: {}", e);
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                Err(e)
            }
        }
    }

    pub(crate) fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(ImputationError::Cancelled);
        }
        Ok(())
    }

    fn run_internal(&self, mut dataset: Dataset) -> Result<ImputationOutcome> {
        let start_time = Instant::now();
        let schema = dataset.schema_arc().clone();
        let target = schema.target_index();
        let max_epochs = self.config.max_epochs;

        info!(
            "Starting imputation: {} rows, {} attributes, target '{}'",
            dataset.len(),
            schema.len(),
            schema.target().name()
        );

        // Step 1: rank attributes and capture the original missingness
        self.report_progress(ProgressUpdate::new(
            ImputationStage::Ranking,
            0.0,
            "Counting missing values...",
        ));
        let partitions: Vec<Partition> = (0..schema.len())
            .map(|attribute| {
                let mut partition = Partition::default();
                for (i, row) in dataset.rows().iter().enumerate() {
                    if row.is_missing(attribute) {
                        partition.missing.push(i);
                    } else {
                        partition.observed.push(i);
                    }
                }
                partition
            })
            .collect();
        let missing_counts: Vec<usize> = partitions.iter().map(|p| p.missing.len()).collect();
        let ranking = rank_by_missingness(&missing_counts, Some(target));
        let cells_missing_before: usize = missing_counts.iter().sum();
        debug!("Missingness ranking: {:?}", ranking);

        let fittable: Vec<usize> = ranking
            .iter()
            .copied()
            .filter(|&l| {
                let partition = &partitions[l];
                if partition.missing.is_empty() {
                    return false;
                }
                if partition.observed.is_empty() {
                    debug!(
                        "Skipping '{}': no observed values to train on",
                        schema.attribute(l).name()
                    );
                    return false;
                }
                true
            })
            .collect();

        // Step 2: seed missing and non-finite cells
        self.report_progress(ProgressUpdate::new(
            ImputationStage::Seeding,
            0.0,
            "Seeding missing values with median / mode...",
        ));
        for attribute in schema.attributes() {
            let index = attribute.index();
            if index == target && !self.config.seed_target {
                continue;
            }
            let values = dataset.column(index);
            let seed = if attribute.is_numeric() {
                statistics::median(&values)
            } else {
                statistics::mode(&values)
            };
            let mut seeded = 0;
            for row in dataset.rows_mut() {
                if !row.value(index).is_finite() {
                    row.set(index, seed);
                    seeded += 1;
                }
            }
            if seeded > 0 {
                debug!("Seeded {} cell(s) of '{}' with {}", seeded, attribute.name(), seed);
            }
        }

        // Step 3: epoch loop
        let mut states: Vec<AttributeState> = (0..schema.len()).map(|_| AttributeState::default()).collect();
        let mut models = AttributeModels::new(schema.clone());
        let mut epochs_run = 0;

        for epoch in 1..=max_epochs {
            if fittable.iter().all(|&l| states[l].stable) {
                break;
            }
            epochs_run = epoch;
            debug!("Epoch {}/{}", epoch, max_epochs);

            for &l in &fittable {
                if states[l].stable {
                    continue;
                }
                self.check_cancelled()?;

                let attribute = schema.attribute(l);
                let learner = self.learners.for_kind(attribute.kind());
                let predictor: Arc<dyn Predictor> = {
                    let observed: Vec<&Row> =
                        partitions[l].observed.iter().map(|&i| dataset.row(i)).collect();
                    Arc::from(learner.fit(&schema, &observed, l)?)
                };
                models.insert(l, predictor.clone());

                let mut sum_of_squares = 0.0;
                for &i in &partitions[l].missing {
                    let before = dataset.row(i).value(l);
                    let after = predictor.predict(dataset.row(i))?;
                    if !after.is_finite() {
                        return Err(ImputationError::predictor(
                            attribute.name(),
                            format!("non-finite prediction {}", after),
                        ));
                    }
                    attribute.validate_value(after)?;
                    dataset.rows_mut()[i].set(l, after);
                    sum_of_squares += (before - after).powi(2);
                }

                let state = &mut states[l];
                state.fits += 1;
                state.learner = Some(learner.name().to_string());
                state.last_change = Some(sum_of_squares);
                if sum_of_squares < self.config.epsilon {
                    state.stable = true;
                    state.stable_at_epoch = Some(epoch);
                    debug!(
                        "'{}' stable at epoch {} (change {:.6})",
                        attribute.name(),
                        epoch,
                        sum_of_squares
                    );
                }

                self.report_progress(ProgressUpdate::fitted(
                    attribute.name(),
                    epoch,
                    max_epochs,
                    format!(
                        "Fitted {} for '{}' (change {:.4})",
                        learner.name(),
                        attribute.name(),
                        sum_of_squares
                    ),
                ));
            }
        }

        let converged = fittable.iter().all(|&l| states[l].stable);
        if converged {
            info!("Imputation converged after {} epoch(s)", epochs_run);
        } else {
            warn!(
                "Imputation reached the epoch limit ({}) before every attribute stabilised",
                max_epochs
            );
        }

        let attributes = ranking
            .iter()
            .copied()
            .chain(std::iter::once(target))
            .map(|l| {
                let attribute = schema.attribute(l);
                let state = &states[l];
                let skipped = if l == target {
                    Some(SkipReason::Target)
                } else if partitions[l].missing.is_empty() {
                    Some(SkipReason::Complete)
                } else if partitions[l].observed.is_empty() {
                    Some(SkipReason::NoObservedRows)
                } else {
                    None
                };
                AttributeReport {
                    name: attribute.name().to_string(),
                    kind: attribute.kind().label().to_string(),
                    rank: ranking.iter().position(|&r| r == l),
                    missing: partitions[l].missing.len(),
                    learner: state.learner.clone(),
                    fits: state.fits,
                    stable_at_epoch: state.stable_at_epoch,
                    last_change: state.last_change,
                    skipped,
                }
            })
            .collect::<Vec<_>>();

        let report = ImputationReport {
            duration_ms: start_time.elapsed().as_millis() as u64,
            rows: dataset.len(),
            target: schema.target().name().to_string(),
            epochs_run,
            max_epochs,
            converged,
            cells_missing_before,
            cells_missing_after: dataset.total_missing(),
            total_fits: states.iter().map(|s| s.fits).sum(),
            attributes,
        };

        info!(
            "Imputed {} cell(s) with {} model fit(s) in {}ms",
            report.cells_missing_before - report.cells_missing_after,
            report.total_fits,
            report.duration_ms
        );

        Ok(ImputationOutcome {
            dataset,
            models,
            report,
        })
    }
}
