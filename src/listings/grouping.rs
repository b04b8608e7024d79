//! Semantic grouping of feature-table columns.
//!
//! The column -> group mapping is configuration: a two-column CSV (`Key,Value`)
//! supplied by the caller, or the copy bundled with the crate. Generated
//! columns follow fixed rules when the mapping does not name them:
//!
//! - `features_unitCount` is `unused` (it only drives the multi-unit filter)
//! - any other `features_*` column is an auxiliary prediction feature
//! - a `<column>_nan` sentinel shares the group of `<column>`

use std::collections::BTreeMap;
use std::io::Read;

use polars::prelude::DataFrame;
use serde::Deserialize;

use crate::domain::ColumnGroup;
use crate::error::{Error, Result};
use crate::frame::column_names;
use crate::listings::features::FEATURE_PREFIX;
use crate::listings::pipeline::MISSING_SUFFIX;

const BUNDLED_MAP: &str = include_str!("../../config/column_to_group_map.csv");
const UNIT_COUNT: &str = "features_unitCount";

#[derive(Debug, Deserialize)]
struct MapRow {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: String,
}

/// Explicit column -> group assignments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnGroupMap {
    entries: BTreeMap<String, ColumnGroup>,
}

impl ColumnGroupMap {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnGroup)>,
        S: Into<String>,
    {
        Self {
            entries: pairs.into_iter().map(|(k, g)| (k.into(), g)).collect(),
        }
    }

    /// Parse a `Key,Value` CSV. Later rows override earlier ones.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut entries = BTreeMap::new();
        for row in reader.deserialize() {
            let row: MapRow = row?;
            entries.insert(row.key, row.value.parse()?);
        }
        Ok(Self { entries })
    }

    /// The mapping shipped in `config/column_to_group_map.csv`.
    pub fn bundled() -> Result<Self> {
        Self::from_reader(BUNDLED_MAP.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Explicit assignment only.
    pub fn get(&self, column: &str) -> Option<ColumnGroup> {
        self.entries.get(column).copied()
    }

    /// Explicit assignment, falling back to the generated-column rules.
    pub fn resolve(&self, column: &str) -> Result<ColumnGroup> {
        if let Some(group) = self.get(column) {
            return Ok(group);
        }
        if column == UNIT_COUNT {
            return Ok(ColumnGroup::Unused);
        }
        if let Some(base) = column.strip_suffix(MISSING_SUFFIX) {
            if !base.is_empty() {
                if let Ok(group) = self.resolve(base) {
                    return Ok(group);
                }
            }
        }
        if column.starts_with(FEATURE_PREFIX) {
            return Ok(ColumnGroup::AuxiliaryPredictionFeatures);
        }
        Err(Error::UnmappedColumn(column.to_string()))
    }
}

/// Group of every column of one frame, in frame order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGrouping {
    columns: Vec<(String, ColumnGroup)>,
}

impl ColumnGrouping {
    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnGroup)> {
        self.columns.iter().map(|(c, g)| (c.as_str(), *g))
    }

    pub fn group_of(&self, column: &str) -> Option<ColumnGroup> {
        self.iter().find(|(c, _)| *c == column).map(|(_, g)| g)
    }

    pub fn columns_in(&self, group: ColumnGroup) -> Vec<String> {
        self.iter()
            .filter(|(_, g)| *g == group)
            .map(|(c, _)| c.to_string())
            .collect()
    }

    /// Key then auxiliary prediction features, each in frame order.
    pub fn prediction_features(&self) -> Vec<String> {
        let mut names = self.columns_in(ColumnGroup::KeyPredictionFeatures);
        names.extend(self.columns_in(ColumnGroup::AuxiliaryPredictionFeatures));
        names
    }

    /// Column count per group, in `ColumnGroup::ALL` order.
    pub fn counts(&self) -> Vec<(ColumnGroup, usize)> {
        ColumnGroup::ALL
            .into_iter()
            .map(|g| (g, self.iter().filter(|(_, c)| *c == g).count()))
            .collect()
    }
}

/// Assign every column of `frame` to a group.
///
/// Fails with `UnmappedColumn` on the first column neither the mapping nor a
/// rule covers; the mapping must be kept in sync with the pipeline output.
pub fn group_columns(frame: &DataFrame, map: &ColumnGroupMap) -> Result<ColumnGrouping> {
    let columns = column_names(frame)
        .into_iter()
        .map(|c| {
            let group = map.resolve(&c)?;
            Ok((c, group))
        })
        .collect::<Result<_>>()?;
    Ok(ColumnGrouping { columns })
}
