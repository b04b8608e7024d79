//! Repeated cross-validation with fresh fold seeds.
//!
//! Each repetition draws its fold seed from the operating system's secure
//! random source, so repeated runs sample the variance due to fold
//! assignment. The drawn seed is part of the record, and `run_with_seeds`
//! replays any repetition exactly.

use log::info;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::domain::{CvConfig, ExperimentConfig, Hyperparameters, Scalar};
use crate::error::{Error, Result};
use crate::eval::cv::cross_validate;
use crate::models::{FeatureTable, ModelFactory};

/// Record keys that hyperparameter names may not shadow.
pub const RESERVED_KEYS: [&str; 4] = ["n_splits", "seed", "train_cv_mse", "test_cv_mse"];

/// Outcome of one repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub n_splits: usize,
    pub seed: u64,
    #[serde(flatten)]
    pub hyperparameters: Hyperparameters,
    pub train_cv_mse: f64,
    pub test_cv_mse: f64,
}

impl ExperimentRecord {
    /// Flat name -> scalar view: split parameters, hyperparameters (by name),
    /// then the two errors.
    pub fn to_flat(&self) -> Result<Vec<(String, Scalar)>> {
        check_reserved(&self.hyperparameters)?;
        let mut flat = Vec::with_capacity(self.hyperparameters.len() + 4);
        flat.push(("n_splits".to_string(), Scalar::Int(as_int("n_splits", self.n_splits)?)));
        flat.push(("seed".to_string(), Scalar::Int(as_int("seed", self.seed)?)));
        flat.extend(
            self.hyperparameters
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        flat.push(("train_cv_mse".to_string(), Scalar::Float(self.train_cv_mse)));
        flat.push(("test_cv_mse".to_string(), Scalar::Float(self.test_cv_mse)));
        Ok(flat)
    }
}

fn as_int<T: Copy + std::fmt::Display>(name: &str, value: T) -> Result<i64>
where
    i64: TryFrom<T>,
{
    i64::try_from(value).map_err(|_| {
        Error::InvalidParameter(format!("{name} {value} does not fit a signed 64-bit integer"))
    })
}

fn check_reserved(hyperparameters: &Hyperparameters) -> Result<()> {
    match RESERVED_KEYS.iter().find(|k| hyperparameters.contains_key(**k)) {
        Some(key) => Err(Error::InvalidParameter(format!(
            "hyperparameter `{key}` collides with an experiment record field"
        ))),
        None => Ok(()),
    }
}

/// Runs repeated cross-validation of one model population.
pub struct ExperimentRunner<'a, F: ModelFactory> {
    factory: &'a F,
    hyperparameters: Hyperparameters,
    config: ExperimentConfig,
}

impl<'a, F: ModelFactory> ExperimentRunner<'a, F> {
    pub fn new(
        factory: &'a F,
        hyperparameters: Hyperparameters,
        config: ExperimentConfig,
    ) -> Result<Self> {
        if config.n_experiments == 0 {
            return Err(Error::InvalidParameter(
                "experiment count must be positive".to_string(),
            ));
        }
        check_reserved(&hyperparameters)?;
        Ok(Self {
            factory,
            hyperparameters,
            config,
        })
    }

    /// Run every repetition and return the last record.
    pub fn run(&self, features: &FeatureTable, target: &[f64]) -> Result<ExperimentRecord> {
        self.run_with_seed_source(features, target, draw_seed)
    }

    /// `run`, drawing each repetition's seed from `next_seed`.
    pub fn run_with_seed_source(
        &self,
        features: &FeatureTable,
        target: &[f64],
        mut next_seed: impl FnMut() -> u64,
    ) -> Result<ExperimentRecord> {
        let mut last = None;
        for _ in 0..self.config.n_experiments {
            last = Some(self.run_once(features, target, next_seed())?);
        }
        last.ok_or_else(|| Error::InvalidParameter("no repetitions were run".to_string()))
    }

    /// Run every repetition and return all records, in run order.
    pub fn run_all(&self, features: &FeatureTable, target: &[f64]) -> Result<Vec<ExperimentRecord>> {
        let seeds: Vec<u64> = (0..self.config.n_experiments).map(|_| draw_seed()).collect();
        self.run_with_seeds(features, target, &seeds)
    }

    /// One repetition per given seed.
    pub fn run_with_seeds(
        &self,
        features: &FeatureTable,
        target: &[f64],
        seeds: &[u64],
    ) -> Result<Vec<ExperimentRecord>> {
        seeds
            .iter()
            .map(|&seed| self.run_once(features, target, seed))
            .collect()
    }

    fn run_once(&self, features: &FeatureTable, target: &[f64], seed: u64) -> Result<ExperimentRecord> {
        let cv = CvConfig {
            n_splits: self.config.n_splits,
            seed,
            parallel: self.config.parallel,
        };
        let outcome = cross_validate(self.factory, &self.hyperparameters, features, target, &cv)?;
        info!(
            "experiment seed {seed}: train cv mse {:.6e}, test cv mse {:.6e}",
            outcome.train_mse, outcome.test_mse
        );
        Ok(ExperimentRecord {
            n_splits: self.config.n_splits,
            seed,
            hyperparameters: self.hyperparameters.clone(),
            train_cv_mse: outcome.train_mse,
            test_cv_mse: outcome.test_mse,
        })
    }
}

/// 32 bits from the OS secure random source.
fn draw_seed() -> u64 {
    u64::from(OsRng.next_u32())
}
