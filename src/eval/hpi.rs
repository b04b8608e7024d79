//! Error attributable to the index publication lag alone.
//!
//! Each sale price is re-estimated by swapping the true index for the one
//! available at sale time, `estimate = price * available / true`, and compared
//! with the actual price. No model is involved: this is the floor any
//! index-driven model inherits from using a lagged index.

use polars::prelude::DataFrame;

use crate::domain::TargetKind;
use crate::error::Result;
use crate::listings::pipeline::{AVAILABLE_INDEX, TRUE_INDEX};
use crate::math::mean_squared_error;
use crate::models::target_from_frame;

/// Mean squared lag error, in prices or in log prices.
pub fn hpi_mse(frame: &DataFrame, target: TargetKind) -> Result<f64> {
    let price = target_from_frame(frame, TargetKind::Price.column_name())?;
    let true_index = target_from_frame(frame, TRUE_INDEX)?;
    let available = target_from_frame(frame, AVAILABLE_INDEX)?;

    let estimate: Vec<f64> = price
        .iter()
        .zip(true_index.iter().zip(&available))
        .map(|(p, (t, a))| p * (a / t))
        .collect();

    match target {
        TargetKind::Price => mean_squared_error(&price, &estimate),
        TargetKind::LogPrice => {
            let ln = |v: &[f64]| v.iter().map(|x| x.ln()).collect::<Vec<_>>();
            mean_squared_error(&ln(&price), &ln(&estimate))
        }
    }
}

/// Square root of `hpi_mse`.
pub fn hpi_rmse(frame: &DataFrame, target: TargetKind) -> Result<f64> {
    Ok(hpi_mse(frame, target)?.sqrt())
}
