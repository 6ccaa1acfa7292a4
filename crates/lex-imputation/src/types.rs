use serde::{Deserialize, Serialize};

// ============================================================================
// Imputation Report Types
// ============================================================================

/// Summary of one imputation run.
///
/// Serializable so hosts can print it (`--json`) or forward it to a UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationReport {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    /// Number of rows in the training batch.
    pub rows: usize,

    /// Name of the target attribute.
    pub target: String,

    /// Number of epochs actually run.
    pub epochs_run: usize,

    /// Configured epoch limit.
    pub max_epochs: usize,

    /// Whether every incomplete attribute became stable before the limit.
    pub converged: bool,

    /// Missing cells across all attributes before imputation, target included.
    pub cells_missing_before: usize,

    /// Missing cells across all attributes after imputation.
    pub cells_missing_after: usize,

    /// Total number of model fits.
    pub total_fits: usize,

    /// One entry per attribute in missingness-rank order; the target is last.
    pub attributes: Vec<AttributeReport>,
}

impl ImputationReport {
    /// Report for an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeReport> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Per-attribute part of an [`ImputationReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeReport {
    pub name: String,

    /// `"numeric"` or `"nominal"`.
    pub kind: String,

    /// Position in the missingness ranking (0 = most missing).
    /// `None` for the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,

    /// Missing cells before seeding.
    pub missing: usize,

    /// Name of the learner used, if the attribute was ever fitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learner: Option<String>,

    /// Number of models fitted for this attribute.
    pub fits: usize,

    /// 1-based epoch in which the attribute became stable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_at_epoch: Option<usize>,

    /// Sum of squared changes from the last fitted epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_change: Option<f64>,

    /// Why the attribute was never fitted, if it wasn't.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

/// Why an attribute received no model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Nothing to impute
    Complete,
    /// The target attribute is never imputed
    Target,
    /// Every cell is missing, so there is nothing to train on
    NoObservedRows,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Complete => "complete",
            Self::Target => "target",
            Self::NoObservedRows => "no observed rows",
        };
        f.write_str(text)
    }
}
