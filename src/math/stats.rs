//! Small descriptive statistics over plain slices.

use crate::error::{Error, Result};

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of the finite values; the average of the two middle values for an
/// even count.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// `mean((truth - estimate)^2)`.
pub fn mean_squared_error(truth: &[f64], estimate: &[f64]) -> Result<f64> {
    if truth.len() != estimate.len() {
        return Err(Error::InvalidParameter(format!(
            "cannot compare {} targets with {} predictions",
            truth.len(),
            estimate.len()
        )));
    }
    let squared: Vec<f64> = truth
        .iter()
        .zip(estimate)
        .map(|(t, e)| (t - e) * (t - e))
        .collect();
    mean(&squared).ok_or_else(|| Error::InvalidParameter("mean squared error of zero rows".into()))
}
