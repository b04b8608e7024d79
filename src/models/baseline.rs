//! Index-scaled price per square foot baseline.
//!
//! Learns one number, the mean of `price / (sqFt * index)` over the training
//! rows, and predicts `rate * sqFt * index`. With the true index this is the
//! mean `timeNormalizedPricePerSqFt`; with the available or predicted index it
//! is what could actually be computed at sale time.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::domain::{Hyperparameters, TargetKind};
use crate::error::{Error, Result};
use crate::listings::pipeline::PREDICTED_INDEX;
use crate::math::mean;
use crate::models::capability::{FeatureTable, Model, check_target_len};
use crate::models::params::ParamReader;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePerSqFtBaseline {
    pub sqft_column: String,
    pub index_column: String,
    pub target: TargetKind,
    rate: Option<f64>,
}

impl Default for PricePerSqFtBaseline {
    fn default() -> Self {
        Self::new("sqFt", PREDICTED_INDEX, TargetKind::Price)
    }
}

impl PricePerSqFtBaseline {
    pub fn new(sqft_column: &str, index_column: &str, target: TargetKind) -> Self {
        Self {
            sqft_column: sqft_column.to_string(),
            index_column: index_column.to_string(),
            target,
            rate: None,
        }
    }

    /// Accepts `sqft_column`, `index_column` and `target` (`price` / `logPrice`).
    pub fn from_hyperparameters(params: &Hyperparameters) -> Result<Self> {
        let defaults = Self::default();
        let mut reader = ParamReader::new("price per sqft baseline", params);
        let sqft = reader.text_or("sqft_column", &defaults.sqft_column)?;
        let index = reader.text_or("index_column", &defaults.index_column)?;
        let target = reader.text_or("target", defaults.target.column_name())?;
        reader.finish()?;
        Ok(Self::new(&sqft, &index, target.parse()?))
    }

    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    /// `sqFt * index` per row.
    fn scale(&self, features: &FeatureTable) -> Result<Vec<f64>> {
        let sqft = features.column(&self.sqft_column)?;
        let index = features.column(&self.index_column)?;
        Ok(sqft.iter().zip(&index).map(|(s, i)| s * i).collect())
    }
}

impl Model for PricePerSqFtBaseline {
    fn fit(&mut self, features: &FeatureTable, target: &[f64]) -> Result<()> {
        check_target_len(features, target)?;
        let ratios: Vec<f64> = self
            .scale(features)?
            .iter()
            .zip(target)
            .map(|(scale, t)| {
                let price = match self.target {
                    TargetKind::Price => *t,
                    TargetKind::LogPrice => t.exp(),
                };
                price / scale
            })
            .collect();
        let rate = mean(&ratios).filter(|r| r.is_finite()).ok_or_else(|| {
            Error::Model("price per square foot is not finite on the training rows".to_string())
        })?;
        self.rate = Some(rate);
        Ok(())
    }

    fn predict(&self, features: &FeatureTable) -> Result<Vec<f64>> {
        let rate = self
            .rate
            .ok_or_else(|| Error::Model("baseline is not fitted".to_string()))?;
        Ok(self
            .scale(features)?
            .iter()
            .map(|scale| {
                let price = rate * scale;
                match self.target {
                    TargetKind::Price => price,
                    TargetKind::LogPrice => price.ln(),
                }
            })
            .collect())
    }

    fn save(&self, destination: &mut dyn Write) -> Result<()> {
        if self.rate.is_none() {
            return Err(Error::Model("baseline is not fitted".to_string()));
        }
        serde_json::to_writer_pretty(destination, self)?;
        Ok(())
    }

    fn load(&mut self, source: &mut dyn Read) -> Result<()> {
        *self = serde_json::from_reader(source)?;
        Ok(())
    }
}
