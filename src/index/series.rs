//! Lag-aware home price index series.
//!
//! The index describing month `M` is only published around `M + lag`. At sale
//! time a model can therefore only see the value from `lag` months earlier
//! (`availableValue`). A per-calendar-month additive correction, the average
//! gap between the true and the available value for that month of year, turns
//! the available value into an estimate of the current one (`predictedValue`).
//!
//! The first `lag` months of a series have no available value and are not
//! part of the output; their true values remain queryable.

use log::{debug, warn};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::domain::{IndexConfig, IndexObservation, Month, SeasonalBasis};
use crate::error::{Error, Result};
use crate::frame::{month_column, number_column};

pub const INDEX_DATE: &str = "date";
pub const INDEX_TRUE: &str = "trueValue";
pub const INDEX_AVAILABLE: &str = "availableValue";
pub const INDEX_PREDICTED: &str = "predictedValue";

/// One retained month of the processed series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPoint {
    pub month: Month,
    pub true_value: f64,
    pub available_value: f64,
    pub predicted_value: f64,
}

/// Processed index series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSeries {
    observations: Vec<IndexObservation>,
    points: Vec<IndexPoint>,
    /// `meanDelta` per month of year (index 0 = January).
    mean_delta: [Option<f64>; 12],
    lag_months: u32,
    basis: SeasonalBasis,
}

impl IndexSeries {
    /// Validate and process raw observations.
    ///
    /// Observations must be ordered by month with exactly one per month and no
    /// gaps; the series must be longer than the lag.
    pub fn build(observations: &[IndexObservation], config: &IndexConfig) -> Result<Self> {
        validate(observations, config.lag_months)?;

        let lag = config.lag_months as usize;
        let points = observations
            .iter()
            .enumerate()
            .skip(lag)
            .map(|(i, obs)| IndexPoint {
                month: obs.month,
                true_value: obs.true_value,
                available_value: observations[i - lag].true_value,
                predicted_value: f64::NAN,
            })
            .collect();

        let series = Self {
            observations: observations.to_vec(),
            points,
            mean_delta: [None; 12],
            lag_months: config.lag_months,
            basis: config.seasonal_basis,
        };
        let series = series.reseasoned(config.seasonal_basis);
        debug!(
            "index series: {} observations, {} retained ({} .. {})",
            series.observations.len(),
            series.points.len(),
            series.points[0].month,
            series.points[series.points.len() - 1].month,
        );
        Ok(series)
    }

    /// Recompute the seasonal correction and predictions from a different basis.
    ///
    /// Use `SeasonalBasis::Through(last_training_month)` to keep the correction
    /// free of information from after the training window.
    pub fn reseasoned(&self, basis: SeasonalBasis) -> Self {
        let mut sums = [0.0_f64; 12];
        let mut counts = [0_usize; 12];
        for p in &self.points {
            if let SeasonalBasis::Through(cutoff) = basis {
                if p.month > cutoff {
                    continue;
                }
            }
            let k = (p.month.month() - 1) as usize;
            sums[k] += p.true_value - p.available_value;
            counts[k] += 1;
        }

        let mut mean_delta = [None; 12];
        for k in 0..12 {
            if counts[k] > 0 {
                mean_delta[k] = Some(sums[k] / counts[k] as f64);
            }
        }

        let mut uncovered = Vec::new();
        let points = self
            .points
            .iter()
            .map(|p| {
                let k = (p.month.month() - 1) as usize;
                let delta = mean_delta[k].unwrap_or_else(|| {
                    if !uncovered.contains(&(k + 1)) {
                        uncovered.push(k + 1);
                    }
                    0.0
                });
                IndexPoint {
                    predicted_value: p.available_value + delta,
                    ..*p
                }
            })
            .collect();
        if !uncovered.is_empty() {
            warn!("no seasonal data for calendar months {uncovered:?}; correction set to 0");
        }

        Self {
            observations: self.observations.clone(),
            points,
            mean_delta,
            lag_months: self.lag_months,
            basis,
        }
    }

    /// Retained months, in chronological order.
    pub fn points(&self) -> &[IndexPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn lag_months(&self) -> u32 {
        self.lag_months
    }

    pub fn basis(&self) -> SeasonalBasis {
        self.basis
    }

    /// The retained point for `month`, if any.
    pub fn get(&self, month: Month) -> Option<&IndexPoint> {
        self.points
            .binary_search_by(|p| p.month.cmp(&month))
            .ok()
            .map(|i| &self.points[i])
    }

    /// True index value for any input month, including the dropped leading ones.
    pub fn true_value(&self, month: Month) -> Option<f64> {
        self.observations
            .binary_search_by(|o| o.month.cmp(&month))
            .ok()
            .map(|i| self.observations[i].true_value)
    }

    /// Average `trueValue - availableValue` for a month of year (`1..=12`).
    pub fn mean_delta(&self, month_of_year: u32) -> Option<f64> {
        month_of_year
            .checked_sub(1)
            .and_then(|k| self.mean_delta.get(k as usize).copied().flatten())
    }

    /// Retained months as a frame: `date` (first day of the month), `trueValue`,
    /// `availableValue`, `predictedValue`.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let values = |name: &str, f: fn(&IndexPoint) -> f64| {
            number_column(name, self.points.iter().map(|p| Some(f(p))).collect())
        };
        let months: Vec<Option<Month>> = self.points.iter().map(|p| Some(p.month)).collect();
        Ok(DataFrame::new(vec![
            month_column(INDEX_DATE, &months)?,
            values(INDEX_TRUE, |p| p.true_value),
            values(INDEX_AVAILABLE, |p| p.available_value),
            values(INDEX_PREDICTED, |p| p.predicted_value),
        ])?)
    }
}

fn validate(observations: &[IndexObservation], lag_months: u32) -> Result<()> {
    if observations.len() <= lag_months as usize {
        return Err(Error::MalformedSeries(format!(
            "{} observations cannot cover a {lag_months}-month publication lag",
            observations.len()
        )));
    }
    for (i, obs) in observations.iter().enumerate() {
        if !obs.true_value.is_finite() {
            return Err(Error::MalformedSeries(format!(
                "non-finite value {} for {}",
                obs.true_value, obs.month
            )));
        }
        if i == 0 {
            continue;
        }
        let prev = observations[i - 1].month;
        match obs.month.months_since(prev) {
            1 => {}
            0 => {
                return Err(Error::MalformedSeries(format!(
                    "duplicate month {}",
                    obs.month
                )));
            }
            gap if gap > 1 => {
                return Err(Error::MalformedSeries(format!(
                    "gap of {} months between {prev} and {}",
                    gap - 1,
                    obs.month
                )));
            }
            _ => {
                return Err(Error::MalformedSeries(format!(
                    "{} follows {prev}: months must be increasing",
                    obs.month
                )));
            }
        }
    }
    Ok(())
}
