//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory while building the feature table
//! - exported next to experiment results
//! - passed around as explicit configuration (no hidden defaults in signatures)

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A calendar month (year + month-of-year), the granularity at which sales are
/// matched against the home price index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Returns `None` unless `month` is in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    /// Month of year, `1..=12`.
    pub fn month(self) -> u32 {
        self.month
    }

    fn ordinal(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    /// Shift by a signed number of months.
    pub fn offset(self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() + months)
    }

    /// Signed number of months from `earlier` to `self`.
    pub fn months_since(self, earlier: Month) -> i64 {
        self.ordinal() - earlier.ordinal()
    }

    /// Days from 1970-01-01 to the first day of the month, the physical value
    /// of a polars `Date`.
    pub fn to_epoch_days(self) -> Option<i32> {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1)?;
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
        i32::try_from(first.signed_duration_since(epoch).num_days()).ok()
    }

    /// Month containing the day `days` after 1970-01-01.
    pub fn from_epoch_days(days: i32) -> Option<Self> {
        NaiveDate::from_ymd_opt(1970, 1, 1)?
            .checked_add_signed(TimeDelta::days(i64::from(days)))
            .map(Self::from_date)
    }

    /// Parse a date-like string down to its month, discarding time of day and
    /// timezone.
    ///
    /// Accepted shapes: RFC 3339 timestamps (wall-clock time kept, offset dropped),
    /// naive `YYYY-MM-DDTHH:MM:SS[.f]` / `YYYY-MM-DD HH:MM:SS`, plain
    /// `YYYY-MM-DD`, and `YYYY-MM`.
    pub fn parse_date_like(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self::from_date(ts.naive_local().date()));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(Self::from_date(ts.date()));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Self::from_date(date));
        }
        raw.parse().ok()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = Error;

    /// Parse `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidParameter(format!("`{s}` is not a YYYY-MM month"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

/// One published index value: the true home price index for `month`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexObservation {
    pub month: Month,
    pub true_value: f64,
}

impl IndexObservation {
    pub fn new(month: Month, true_value: f64) -> Self {
        Self { month, true_value }
    }
}

/// Nested mapping such as a listing's construction features.
pub type NestedMap = BTreeMap<String, Value>;

/// One raw property record, shaped like a RentCast `properties` response.
///
/// Top-level attributes are kept as loosely typed JSON values; the nested
/// construction `features` mapping is kept apart because it is expanded into
/// one-hot columns rather than copied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<NestedMap>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl RawListing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder-style setter for one entry of the nested features mapping.
    pub fn with_feature(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.features
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Which target an error metric or model works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "logPrice")]
    LogPrice,
}

impl TargetKind {
    pub fn column_name(self) -> &'static str {
        match self {
            TargetKind::Price => "price",
            TargetKind::LogPrice => "logPrice",
        }
    }
}

impl FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "price" => Ok(TargetKind::Price),
            "logPrice" => Ok(TargetKind::LogPrice),
            other => Err(Error::InvalidParameter(format!(
                "unknown target `{other}` (expected `price` or `logPrice`)"
            ))),
        }
    }
}

/// Semantic group of a feature-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnGroup {
    /// Address, ZIP code, dates and other row identity.
    Identification,
    KeyPredictionFeatures,
    AuxiliaryPredictionFeatures,
    Target,
    Unused,
}

impl ColumnGroup {
    pub const ALL: [ColumnGroup; 5] = [
        ColumnGroup::Identification,
        ColumnGroup::KeyPredictionFeatures,
        ColumnGroup::AuxiliaryPredictionFeatures,
        ColumnGroup::Target,
        ColumnGroup::Unused,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ColumnGroup::Identification => "identification",
            ColumnGroup::KeyPredictionFeatures => "keyPredictionFeatures",
            ColumnGroup::AuxiliaryPredictionFeatures => "auxiliaryPredictionFeatures",
            ColumnGroup::Target => "target",
            ColumnGroup::Unused => "unused",
        }
    }

    pub fn is_prediction_feature(self) -> bool {
        matches!(
            self,
            ColumnGroup::KeyPredictionFeatures | ColumnGroup::AuxiliaryPredictionFeatures
        )
    }
}

impl FromStr for ColumnGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ColumnGroup::ALL
            .into_iter()
            .find(|g| g.label() == s.trim())
            .ok_or_else(|| Error::InvalidParameter(format!("unknown column group `{s}`")))
    }
}

/// A scalar value in a hyperparameter set or an experiment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// Fixed hyperparameters for one model population, keyed by name.
pub type Hyperparameters = BTreeMap<String, Scalar>;

/// How the per-calendar-month seasonal correction is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeasonalBasis {
    /// Average over every retained month of the series.
    ///
    /// Uses months later than any given prediction point; inside
    /// cross-validation this lets future index movements inform the feature.
    #[default]
    FullSeries,
    /// Average only over retained months up to and including the cutoff.
    Through(Month),
}

/// Index series processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Publication delay of the index, in months.
    pub lag_months: u32,
    pub seasonal_basis: SeasonalBasis,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            lag_months: 3,
            seasonal_basis: SeasonalBasis::FullSeries,
        }
    }
}

/// Listing feature pipeline settings.
///
/// Column names refer to the raw source fields for the stages that run before
/// renaming, and to canonical names afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub property_type_column: String,
    /// Only records whose property type equals this label are kept.
    pub single_family_label: String,
    /// Raw size columns; records missing any of them are dropped.
    pub size_columns: Vec<String>,
    /// Raw name -> canonical name.
    pub renames: Vec<(String, String)>,
    /// Raw column holding the nested features mapping.
    pub features_column: String,
    pub unit_count_column: String,
    pub max_unit_count: f64,
    /// Numeric prediction features imputed with zero (with a sentinel each).
    pub zero_fill_columns: Vec<String>,
    /// Column imputed with its median (with a sentinel).
    pub median_fill_column: String,
    pub sale_date_column: String,
    pub price_column: String,
    pub sqft_column: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            property_type_column: "propertyType".to_string(),
            single_family_label: "Single Family".to_string(),
            size_columns: owned(&["squareFootage", "lotSize"]),
            renames: vec![
                ("lastSalePrice".to_string(), "price".to_string()),
                ("squareFootage".to_string(), "sqFt".to_string()),
                ("lastSaleDate".to_string(), "saleDate".to_string()),
            ],
            features_column: "features".to_string(),
            unit_count_column: "features_unitCount".to_string(),
            max_unit_count: 1.0,
            zero_fill_columns: owned(&[
                "bedrooms",
                "bathrooms",
                "features_floorCount",
                "features_garageSpaces",
                "features_roomCount",
            ]),
            median_fill_column: "yearBuilt".to_string(),
            sale_date_column: "saleDate".to_string(),
            price_column: "price".to_string(),
            sqft_column: "sqFt".to_string(),
        }
    }
}

/// Inclusive band for `timeNormalizedPricePerSqFt`; rows outside are outliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierCutoff {
    pub low: f64,
    pub high: f64,
}

impl OutlierCutoff {
    pub fn new(low: f64, high: f64) -> Result<Self> {
        let cutoff = Self { low, high };
        cutoff.validate()?;
        Ok(cutoff)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.low.is_finite() && self.high.is_finite() && self.low <= self.high) {
            return Err(Error::InvalidParameter(format!(
                "outlier cutoff [{}, {}] must be finite with low <= high",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

impl Default for OutlierCutoff {
    fn default() -> Self {
        Self {
            low: 0.2,
            high: 2.0,
        }
    }
}

/// Cross-validation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvConfig {
    pub n_splits: usize,
    pub seed: u64,
    /// Train folds on the rayon pool.
    pub parallel: bool,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            seed: 2026,
            parallel: true,
        }
    }
}

/// Repeated cross-validation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub n_experiments: usize,
    pub n_splits: usize,
    pub parallel: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_experiments: 10,
            n_splits: 5,
            parallel: true,
        }
    }
}
