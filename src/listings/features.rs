//! Expansion of the nested construction-features mapping.
//!
//! Each listing carries a mapping such as `{"roofType": "Slate", "unitCount": 1}`.
//! Nested objects are flattened first, so `{"heating": {"type": "Gas"}}`
//! becomes the key `heating.type`. Then:
//!
//! - a key whose observed values are all numbers becomes one numeric column
//! - a key whose values are all booleans, present on every row, becomes one
//!   0/1 column
//! - every other key is one-hot encoded: one 0/1 column per observed value
//!   plus a `_nan` column flagging listings without that key
//!
//! Generated names drop non-word characters and carry the `features_` prefix,
//! e.g. `features_exteriorType_Brick`, `features_pool_True`, `features_roofType_nan`.

use std::collections::BTreeSet;

use log::debug;
use polars::prelude::DataFrame;
use serde_json::Value;

use crate::domain::NestedMap;
use crate::error::{Error, Result};
use crate::frame::{number_column, texts};
use crate::io::ingest::{value_as_f64, value_as_text};

pub const FEATURE_PREFIX: &str = "features_";

const STAGE: &str = "feature expansion";

/// Replace the JSON text column `column` with its expanded columns, appended
/// at the end.
pub fn expand_features(frame: DataFrame, column: &str) -> Result<DataFrame> {
    let nested = parse_rows(&frame, column)?;
    let keys: BTreeSet<&String> = nested.iter().flatten().flat_map(|m| m.keys()).collect();

    // Generated name -> values; names may collide after sanitizing, in which
    // case the one-hot indicators are merged.
    let mut generated: Vec<(String, Vec<Option<f64>>)> = Vec::new();
    let mut push = |name: String, values: Vec<Option<f64>>| {
        match generated.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => {
                for (e, v) in existing.iter_mut().zip(values) {
                    *e = match (*e, v) {
                        (Some(a), Some(b)) => Some(a.max(b)),
                        (a, b) => a.or(b),
                    };
                }
            }
            None => generated.push((name, values)),
        }
    };

    for key in keys {
        let cells: Vec<Option<&Value>> = nested
            .iter()
            .map(|m| m.as_ref().and_then(|m| m.get(key)).filter(|v| !v.is_null()))
            .collect();

        if stays_numeric(&cells) {
            let values = cells.iter().map(|c| c.and_then(value_as_f64)).collect();
            push(feature_name(key), values);
            continue;
        }

        let categories: BTreeSet<String> = cells.iter().flatten().map(|v| category(v)).collect();
        for label in &categories {
            let values = cells
                .iter()
                .map(|c| {
                    let hit = c.is_some_and(|v| category(v) == *label);
                    Some(if hit { 1.0 } else { 0.0 })
                })
                .collect();
            push(feature_name(&format!("{key}_{label}")), values);
        }
        let missing = cells
            .iter()
            .map(|c| Some(if c.is_none() { 1.0 } else { 0.0 }))
            .collect();
        push(feature_name(&format!("{key}_nan")), missing);
    }

    let mut out = frame.drop(column)?;
    let n_generated = generated.len();
    for (name, values) in generated {
        out.with_column(number_column(&name, values))?;
    }
    debug!("expanded `{column}` into {n_generated} columns");
    Ok(out)
}

/// `features_` + the name with every non-word character removed.
pub fn feature_name(raw: &str) -> String {
    format!("{FEATURE_PREFIX}{}", sanitize(raw))
}

fn parse_rows(frame: &DataFrame, column: &str) -> Result<Vec<Option<NestedMap>>> {
    texts(frame, column, STAGE)?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => Ok(None),
            Some(text) => match serde_json::from_str::<NestedMap>(&text) {
                Ok(map) => Ok(Some(flatten(map))),
                Err(_) => Err(Error::InvalidValue {
                    column: column.to_string(),
                    row,
                    value: text,
                }),
            },
        })
        .collect()
}

/// Lift nested objects into dotted keys, at any depth.
fn flatten(map: NestedMap) -> NestedMap {
    let mut out = NestedMap::new();
    for (key, value) in map {
        match value {
            Value::Object(inner) => {
                let inner: NestedMap = inner.into_iter().collect();
                for (sub, v) in flatten(inner) {
                    out.insert(format!("{key}.{sub}"), v);
                }
            }
            other => {
                out.insert(key, other);
            }
        }
    }
    out
}

fn stays_numeric(cells: &[Option<&Value>]) -> bool {
    let present: Vec<&Value> = cells.iter().flatten().copied().collect();
    if present.iter().all(|v| v.is_number()) {
        return true;
    }
    present.len() == cells.len() && present.iter().all(|v| v.is_boolean())
}

fn category(value: &Value) -> String {
    match value {
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => value_as_text(other),
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}
