//! Raw record ingest.
//!
//! Parsing files is the caller's job. This module takes already-parsed
//! records and lays them out as a polars `DataFrame`:
//!
//! - listing attributes become one column each, typed by what they hold
//! - the nested features mapping stays a single column of compact JSON text
//! - an index table (date text + value) becomes ordered `IndexObservation`s

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use polars::prelude::{Column, DataFrame};
use serde_json::Value;

use crate::domain::{IndexObservation, Month, RawListing};
use crate::error::{Error, Result};
use crate::frame::{number_column, numbers, text_column, texts};

/// Column names of a raw index table (FRED `CSUSHPINSA` export by default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumns {
    pub date: String,
    pub value: String,
}

impl Default for IndexColumns {
    fn default() -> Self {
        Self {
            date: "observation_date".to_string(),
            value: "CSUSHPINSA".to_string(),
        }
    }
}

/// Lay out raw listings as a frame.
///
/// Attribute columns are sorted by name. A column whose present values are all
/// numbers or booleans is `Float64` (booleans as 0/1); anything else is
/// `String`, with nested JSON rendered compactly. A column with no present
/// value is `Float64`. The features mapping becomes the JSON text column
/// `features_column`.
pub fn listings_to_frame(listings: &[RawListing], features_column: &str) -> Result<DataFrame> {
    let keys: BTreeSet<String> = listings
        .iter()
        .flat_map(|l| l.attributes.keys())
        .map(|k| normalize_key(k))
        .collect();

    let mut columns: Vec<Column> = Vec::with_capacity(keys.len() + 1);
    for key in keys.iter().filter(|k| *k != features_column) {
        let values: Vec<Option<&Value>> = listings
            .iter()
            .map(|l| lookup(&l.attributes, key).filter(|v| !v.is_null()))
            .collect();
        columns.push(infer_column(key, &values));
    }

    let features = listings
        .iter()
        .map(|l| l.features.as_ref().map(serde_json::to_string).transpose())
        .collect::<serde_json::Result<Vec<_>>>()?;
    columns.push(text_column(features_column, features));

    let frame = DataFrame::new(columns)?;
    debug!(
        "ingested {} listings into {} columns",
        frame.height(),
        frame.width()
    );
    Ok(frame)
}

/// Read an index table into observations ordered as given.
///
/// Dates may be any shape `Month::parse_date_like` accepts; missing or
/// unparseable cells are errors.
pub fn index_observations_from_frame(
    frame: &DataFrame,
    columns: &IndexColumns,
) -> Result<Vec<IndexObservation>> {
    const STAGE: &str = "index ingest";
    let dates = texts(frame, &columns.date, STAGE)?;
    let values = numbers(frame, &columns.value, STAGE)?;

    dates
        .iter()
        .zip(values)
        .enumerate()
        .map(|(row, (date, value))| {
            let raw = date.as_deref().ok_or_else(|| Error::MissingValue {
                column: columns.date.clone(),
                row,
            })?;
            let month = Month::parse_date_like(raw).ok_or_else(|| Error::InvalidValue {
                column: columns.date.clone(),
                row,
                value: raw.to_string(),
            })?;
            let true_value = value.ok_or_else(|| Error::MissingValue {
                column: columns.value.clone(),
                row,
            })?;
            Ok(IndexObservation::new(month, true_value))
        })
        .collect()
}

fn normalize_key(name: &str) -> String {
    // Exports sometimes carry a UTF-8 BOM on the first key; strip it so that
    // schema lookups do not report the column as missing.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn lookup<'a>(attributes: &'a BTreeMap<String, Value>, key: &str) -> Option<&'a Value> {
    attributes
        .get(key)
        .or_else(|| attributes.iter().find(|(k, _)| normalize_key(k) == key).map(|(_, v)| v))
}

fn infer_column(name: &str, values: &[Option<&Value>]) -> Column {
    let numeric = values
        .iter()
        .flatten()
        .all(|v| v.is_number() || v.is_boolean());
    if numeric {
        return number_column(name, values.iter().map(|v| v.and_then(value_as_f64)).collect());
    }
    text_column(name, values.iter().map(|v| v.map(value_as_text)).collect())
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub(crate) fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
