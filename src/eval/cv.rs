//! K-fold cross-validation over any `ModelFactory`.
//!
//! Each fold gets its own model built from the same hyperparameters, so folds
//! share nothing but the read-only feature table and target. With
//! `CvConfig::parallel` they run on the rayon pool; results are kept in fold
//! order, so the averages do not depend on scheduling.

use log::{debug, info};
use rayon::prelude::*;

use crate::domain::{CvConfig, Hyperparameters};
use crate::error::{Error, Result};
use crate::eval::folds::{Fold, k_fold};
use crate::math::mean;
use crate::models::{FeatureTable, Model, ModelFactory};

/// Errors of one fold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldScore {
    pub train_mse: f64,
    pub test_mse: f64,
}

/// Result of one cross-validation run.
#[derive(Debug)]
pub struct CvOutcome<M> {
    /// Mean train MSE over folds.
    pub train_mse: f64,
    /// Mean test MSE over folds.
    pub test_mse: f64,
    pub folds: Vec<FoldScore>,
    /// The fitted model of each fold, in fold order.
    pub models: Vec<M>,
}

/// Cross-validate the models built by `factory` on `features` / `target`.
pub fn cross_validate<F: ModelFactory>(
    factory: &F,
    hyperparameters: &Hyperparameters,
    features: &FeatureTable,
    target: &[f64],
    config: &CvConfig,
) -> Result<CvOutcome<F::Model>> {
    if features.n_rows() != target.len() {
        return Err(Error::InvalidParameter(format!(
            "{} feature rows but {} target values",
            features.n_rows(),
            target.len()
        )));
    }
    let folds = k_fold(features.n_rows(), config.n_splits, config.seed)?;

    let run = |(i, fold): (usize, &Fold)| -> Result<(FoldScore, F::Model)> {
        let train_x = features.select_rows(&fold.train);
        let test_x = features.select_rows(&fold.test);
        let train_y = gather(target, &fold.train);
        let test_y = gather(target, &fold.test);

        let mut model = factory.build(hyperparameters)?;
        model.fit(&train_x, &train_y)?;
        let score = FoldScore {
            train_mse: model.evaluate(&train_x, &train_y)?,
            test_mse: model.evaluate(&test_x, &test_y)?,
        };
        debug!(
            "fold {}/{}: train mse {:.6e}, test mse {:.6e}",
            i + 1,
            folds.len(),
            score.train_mse,
            score.test_mse
        );
        Ok((score, model))
    };

    let results: Vec<Result<(FoldScore, F::Model)>> = if config.parallel {
        folds.par_iter().enumerate().map(run).collect()
    } else {
        folds.iter().enumerate().map(run).collect()
    };

    let mut scores = Vec::with_capacity(folds.len());
    let mut models = Vec::with_capacity(folds.len());
    for result in results {
        let (score, model) = result?;
        scores.push(score);
        models.push(model);
    }

    let train: Vec<f64> = scores.iter().map(|s| s.train_mse).collect();
    let test: Vec<f64> = scores.iter().map(|s| s.test_mse).collect();
    let outcome = CvOutcome {
        train_mse: mean(&train).unwrap_or(f64::NAN),
        test_mse: mean(&test).unwrap_or(f64::NAN),
        folds: scores,
        models,
    };
    info!(
        "{}-fold cv (seed {}): train mse {:.6e}, test mse {:.6e}",
        config.n_splits, config.seed, outcome.train_mse, outcome.test_mse
    );
    Ok(outcome)
}

fn gather(values: &[f64], rows: &[usize]) -> Vec<f64> {
    rows.iter().map(|&r| values[r]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinearRegression, PricePerSqFtBaseline};
    use nalgebra::DMatrix;

    fn data(n: usize) -> (FeatureTable, Vec<f64>) {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let noise = |i: usize| if i % 2 == 0 { 0.5 } else { -0.5 };
        let y = (0..n).map(|i| 3.0 + 2.0 * x[i] + noise(i)).collect();
        let table = FeatureTable::new(vec!["x".into()], DMatrix::from_column_slice(n, 1, &x)).unwrap();
        (table, y)
    }

    fn factory(params: &Hyperparameters) -> Result<LinearRegression> {
        LinearRegression::from_hyperparameters(params)
    }

    #[test]
    fn same_seed_gives_identical_scores() {
        let (x, y) = data(30);
        let config = CvConfig::default();
        let a = cross_validate(&factory, &Hyperparameters::new(), &x, &y, &config).unwrap();
        let b = cross_validate(&factory, &Hyperparameters::new(), &x, &y, &config).unwrap();
        assert_eq!(a.folds, b.folds);
        assert_eq!(a.train_mse, b.train_mse);
        assert_eq!(a.test_mse, b.test_mse);
        assert_eq!(a.models.len(), 5);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let (x, y) = data(25);
        let par = CvConfig {
            parallel: true,
            ..CvConfig::default()
        };
        let seq = CvConfig {
            parallel: false,
            ..CvConfig::default()
        };
        let a = cross_validate(&factory, &Hyperparameters::new(), &x, &y, &par).unwrap();
        let b = cross_validate(&factory, &Hyperparameters::new(), &x, &y, &seq).unwrap();
        assert_eq!(a.folds, b.folds);
    }

    #[test]
    fn aggregate_is_the_mean_of_folds() {
        let (x, y) = data(20);
        let out = cross_validate(&factory, &Hyperparameters::new(), &x, &y, &CvConfig::default())
            .unwrap();
        let mean_test = out.folds.iter().map(|f| f.test_mse).sum::<f64>() / 5.0;
        assert!((out.test_mse - mean_test).abs() < 1e-12);
        // Noise is +-0.5: least squares can only do better than 0.25 in-sample.
        assert!(out.train_mse > 0.15 && out.train_mse <= 0.25 + 1e-9);
    }

    #[test]
    fn factory_errors_propagate() {
        let (x, y) = data(10);
        let mut params = Hyperparameters::new();
        params.insert("depth".into(), 3_i64.into());
        assert!(matches!(
            cross_validate(&factory, &params, &x, &y, &CvConfig::default()),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn fitted_models_are_returned_per_fold() {
        let sqft: Vec<f64> = (0..12).map(|i| 1000.0 + 100.0 * i as f64).collect();
        let mut values = sqft.clone();
        values.extend(std::iter::repeat(250.0).take(12));
        let x = FeatureTable::new(
            vec!["sqFt".into(), "predictedValueHomePriceIndex".into()],
            DMatrix::from_column_slice(12, 2, &values),
        )
        .unwrap();
        let y: Vec<f64> = sqft.iter().map(|s| 1.2 * s * 250.0).collect();
        let baseline = |_: &Hyperparameters| -> Result<PricePerSqFtBaseline> {
            Ok(PricePerSqFtBaseline::default())
        };
        let out =
            cross_validate(&baseline, &Hyperparameters::new(), &x, &y, &CvConfig::default()).unwrap();
        for model in &out.models {
            assert!((model.rate().unwrap() - 1.2).abs() < 1e-12);
        }
        assert!(out.test_mse < 1e-12);
    }
}
