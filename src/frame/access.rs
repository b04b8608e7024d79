//! Checked column lookup and typed reads.
//!
//! Numeric columns are always `Float64`, text columns `String` and months
//! `Date` (first day of the month). A stage asking for a different kind gets
//! `InvalidParameter` rather than a silent cast.

use polars::prelude::*;

use crate::domain::Month;
use crate::error::{Error, Result};

pub fn contains(frame: &DataFrame, name: &str) -> bool {
    frame.get_column_index(name).is_some()
}

/// Column names in frame order.
pub fn column_names(frame: &DataFrame) -> Vec<String> {
    frame
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect()
}

/// Look up a column a stage depends on.
pub fn require<'a>(frame: &'a DataFrame, name: &str, stage: &'static str) -> Result<&'a Column> {
    frame
        .column(name)
        .map_err(|_| Error::missing_column(name, stage))
}

/// Look up a column that must hold `dtype` values.
pub fn require_dtype<'a>(
    frame: &'a DataFrame,
    name: &str,
    stage: &'static str,
    dtype: &DataType,
) -> Result<&'a Column> {
    let column = require(frame, name, stage)?;
    if column.dtype() != dtype {
        return Err(Error::InvalidParameter(format!(
            "column `{name}` holds {} values, expected {dtype}",
            column.dtype()
        )));
    }
    Ok(column)
}

/// Values of a `Float64` column. `NaN` reads as missing.
pub fn numbers(frame: &DataFrame, name: &str, stage: &'static str) -> Result<Vec<Option<f64>>> {
    Ok(require_dtype(frame, name, stage, &DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

pub fn texts(frame: &DataFrame, name: &str, stage: &'static str) -> Result<Vec<Option<String>>> {
    Ok(require_dtype(frame, name, stage, &DataType::String)?
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

pub fn months(frame: &DataFrame, name: &str, stage: &'static str) -> Result<Vec<Option<Month>>> {
    let days = require_dtype(frame, name, stage, &DataType::Date)?.cast(&DataType::Int32)?;
    days.i32()?
        .into_iter()
        .enumerate()
        .map(|(row, d)| match d {
            None => Ok(None),
            Some(d) => Month::from_epoch_days(d)
                .map(Some)
                .ok_or_else(|| Error::InvalidValue {
                    column: name.to_string(),
                    row,
                    value: d.to_string(),
                }),
        })
        .collect()
}

/// Number of missing cells. `NaN` counts as missing.
pub fn missing_cells(frame: &DataFrame, name: &str, stage: &'static str) -> Result<usize> {
    let column = require(frame, name, stage)?;
    if column.dtype() == &DataType::Float64 {
        return Ok(numbers(frame, name, stage)?
            .iter()
            .filter(|v| v.is_none())
            .count());
    }
    Ok(column.null_count())
}

pub fn number_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Column::new(name.into(), values)
}

pub fn text_column(name: &str, values: Vec<Option<String>>) -> Column {
    Column::new(name.into(), values)
}

/// A `Date` column holding the first day of each month.
pub fn month_column(name: &str, months: &[Option<Month>]) -> Result<Column> {
    let days = months
        .iter()
        .map(|m| match m {
            None => Ok(None),
            Some(m) => m
                .to_epoch_days()
                .map(Some)
                .ok_or_else(|| Error::InvalidParameter(format!("month {m} is out of range"))),
        })
        .collect::<Result<Vec<Option<i32>>>>()?;
    Ok(Column::new(name.into(), days).cast(&DataType::Date)?)
}

/// Drop every named column that is present.
pub fn drop_columns(frame: DataFrame, names: &[String]) -> Result<DataFrame> {
    names.iter().try_fold(frame, |frame, name| {
        if contains(&frame, name) {
            Ok(frame.drop(name)?)
        } else {
            Ok(frame)
        }
    })
}
