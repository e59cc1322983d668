//! Distribution summaries and dispersion measures.

use serde::Serialize;

/// Box-plot summary of a set of daily values.
///
/// Statistics are `None` when every value was undefined.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DistributionSummary {
    /// Number of defined values.
    pub count: usize,
    /// Number of undefined values left out of the statistics.
    pub missing: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl DistributionSummary {
    /// Summarizes values, skipping `None` entries.
    ///
    /// The result does not depend on input order.
    pub fn from_values(values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let mut missing = 0;
        let mut sorted: Vec<f64> = values
            .into_iter()
            .filter_map(|v| {
                if v.is_none() {
                    missing += 1;
                }
                v
            })
            .collect();
        sorted.sort_by(f64::total_cmp);

        if sorted.is_empty() {
            return Self {
                missing,
                ..Self::default()
            };
        }

        Self {
            count: sorted.len(),
            missing,
            mean: mean(&sorted),
            median: quantile(&sorted, 0.5),
            q1: quantile(&sorted, 0.25),
            q3: quantile(&sorted, 0.75),
            min: sorted.first().copied(),
            max: sorted.last().copied(),
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Quantile of an ascending slice, interpolating linearly between the
/// closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = q.clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Population coefficient of variation, `std / mean`.
///
/// Returns `None` for an empty slice or a zero mean.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m == 0.0 {
        return None;
    }
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt() / m)
}

/// Gini coefficient of non-negative values.
///
/// 0 means perfectly even; values approach 1 as one element dominates.
/// Returns `None` for an empty slice or a zero total.
pub fn gini(values: &[f64]) -> Option<f64> {
    let total: f64 = values.iter().sum();
    if values.is_empty() || total == 0.0 {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64 + 1.0) * v)
        .sum();
    Some(2.0 * weighted / (n * total) - (n + 1.0) / n)
}
