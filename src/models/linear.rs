//! Ordinary least squares linear regression.

use std::io::{Read, Write};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::domain::Hyperparameters;
use crate::error::{Error, Result};
use crate::math::{solve_least_squares, with_intercept};
use crate::models::capability::{FeatureTable, Model, check_target_len};
use crate::models::params::ParamReader;

/// Trained coefficients, keyed to the feature columns they were fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub features: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegression {
    fit_intercept: bool,
    fitted: Option<LinearFit>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LinearRegression {
    pub fn new(fit_intercept: bool) -> Self {
        Self {
            fit_intercept,
            fitted: None,
        }
    }

    /// Accepts `fit_intercept` (bool, default true).
    pub fn from_hyperparameters(params: &Hyperparameters) -> Result<Self> {
        let mut reader = ParamReader::new("linear regression", params);
        let fit_intercept = reader.bool_or("fit_intercept", true)?;
        reader.finish()?;
        Ok(Self::new(fit_intercept))
    }

    pub fn fitted(&self) -> Option<&LinearFit> {
        self.fitted.as_ref()
    }

    fn trained(&self) -> Result<&LinearFit> {
        self.fitted
            .as_ref()
            .ok_or_else(|| Error::Model("linear regression is not fitted".to_string()))
    }
}

impl Model for LinearRegression {
    fn fit(&mut self, features: &FeatureTable, target: &[f64]) -> Result<()> {
        check_target_len(features, target)?;
        let x = if self.fit_intercept {
            with_intercept(features.values())
        } else {
            features.values().clone()
        };
        let y = DVector::from_column_slice(target);
        let beta = solve_least_squares(&x, &y)
            .ok_or_else(|| Error::Model("least squares has no finite solution".to_string()))?;

        let (intercept, coefficients) = if self.fit_intercept {
            (beta[0], beta.iter().skip(1).copied().collect())
        } else {
            (0.0, beta.iter().copied().collect())
        };
        self.fitted = Some(LinearFit {
            features: features.names().to_vec(),
            intercept,
            coefficients,
        });
        Ok(())
    }

    fn predict(&self, features: &FeatureTable) -> Result<Vec<f64>> {
        let fit = self.trained()?;
        if features.names() != fit.features.as_slice() {
            return Err(Error::InvalidParameter(format!(
                "model was fitted on {:?}, got {:?}",
                fit.features,
                features.names()
            )));
        }
        let beta = DVector::from_column_slice(&fit.coefficients);
        let y = features.values() * beta;
        Ok(y.iter().map(|v| v + fit.intercept).collect())
    }

    fn save(&self, destination: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(destination, self.trained()?)?;
        Ok(())
    }

    fn load(&mut self, source: &mut dyn Read) -> Result<()> {
        let fit: LinearFit = serde_json::from_reader(source)?;
        if fit.features.len() != fit.coefficients.len() {
            return Err(Error::Model(format!(
                "{} coefficients for {} features",
                fit.coefficients.len(),
                fit.features.len()
            )));
        }
        self.fitted = Some(fit);
        Ok(())
    }
}
