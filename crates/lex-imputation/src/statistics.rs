//! NaN-aware column statistics used to seed imputation.
//!
//! Missing cells are represented as NaN (see [`crate::dataset::MISSING`]).
//! Every function here ignores them. Empty or all-missing input is not an
//! error: the functions return `0.0` so that seeding can always proceed.

use crate::dataset::{Row, is_missing};
use std::cmp::Ordering;

/// Arithmetic mean of the non-missing values, or `0.0` if there are none.
pub fn mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !is_missing(**v))
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Median of the non-missing values, or `0.0` if there are none.
///
/// An even number of values yields the average of the two middle entries.
pub fn median(values: &[f64]) -> f64 {
    let observed = observed_sorted(values);
    if observed.is_empty() {
        return 0.0;
    }

    let mid = observed.len() / 2;
    if observed.len() % 2 == 0 {
        (observed[mid - 1] + observed[mid]) / 2.0
    } else {
        observed[mid]
    }
}

/// Most frequent non-missing value, or `0.0` if there are none.
///
/// Ties go to the smallest value.
pub fn mode(values: &[f64]) -> f64 {
    let observed = observed_sorted(values);

    let mut best: Option<(f64, usize)> = None;
    let mut run_start = 0;
    // Runs of equal values are contiguous after sorting; a strictly greater
    // count is required to replace the current best, so the smallest wins.
    for i in 1..=observed.len() {
        if i == observed.len() || observed[i] != observed[run_start] {
            let count = i - run_start;
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((observed[run_start], count));
            }
            run_start = i;
        }
    }

    best.map(|(value, _)| value).unwrap_or(0.0)
}

/// Number of missing entries.
pub fn missing_count(values: &[f64]) -> usize {
    values.iter().filter(|v| is_missing(**v)).count()
}

/// Extract one attribute's values from a set of rows.
pub fn column(rows: &[Row], index: usize) -> Vec<f64> {
    rows.iter().map(|row| row.value(index)).collect()
}

fn observed_sorted(values: &[f64]) -> Vec<f64> {
    let mut observed: Vec<f64> = values.iter().copied().filter(|v| !is_missing(*v)).collect();
    observed.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    observed
}
