//! The model contract the evaluation harness depends on.
//!
//! A model is anything that can be fitted on a feature table and a target,
//! then predict the target for new rows. The harness never looks inside a
//! model; it only:
//!
//! - builds a fresh instance per fold through a `ModelFactory`
//! - calls `fit` on the training rows
//! - calls `evaluate` (mean squared error) on train and test rows
//!
//! Persistence is optional: the default `save` / `load` report `Unsupported`.

use std::io::{Read, Write};

use nalgebra::DMatrix;
use polars::prelude::DataFrame;

use crate::domain::Hyperparameters;
use crate::error::{Error, Result};
use crate::frame::{dense_values, to_matrix};
use crate::math::mean_squared_error;

/// Dense numeric feature matrix with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    names: Vec<String>,
    values: DMatrix<f64>,
}

impl FeatureTable {
    pub fn new(names: Vec<String>, values: DMatrix<f64>) -> Result<Self> {
        if names.len() != values.ncols() {
            return Err(Error::InvalidParameter(format!(
                "{} feature names for {} columns",
                names.len(),
                values.ncols()
            )));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(Error::InvalidParameter(format!("duplicate feature `{name}`")));
            }
        }
        Ok(Self { names, values })
    }

    /// Gather the named numeric columns of `frame`; every cell must be present.
    pub fn from_frame(frame: &DataFrame, columns: &[String]) -> Result<Self> {
        Self::new(columns.to_vec(), to_matrix(frame, columns)?)
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// One feature column as a plain vector.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let j = self
            .position(name)
            .ok_or_else(|| Error::missing_column(name, "feature lookup"))?;
        Ok(self.values.column(j).iter().copied().collect())
    }

    /// Rows at the given positions, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            values: self.values.select_rows(rows.iter()),
        }
    }
}

/// Numeric target column of `frame`; every cell must be present.
pub fn target_from_frame(frame: &DataFrame, column: &str) -> Result<Vec<f64>> {
    dense_values(frame, column, "target extraction")
}

/// A trainable regression model.
pub trait Model: Send {
    /// Train on `features` / `target`, replacing any earlier trained state.
    fn fit(&mut self, features: &FeatureTable, target: &[f64]) -> Result<()>;

    fn predict(&self, features: &FeatureTable) -> Result<Vec<f64>>;

    /// Mean squared error of the predictions against `target`.
    fn evaluate(&self, features: &FeatureTable, target: &[f64]) -> Result<f64> {
        let predictions = self.predict(features)?;
        mean_squared_error(target, &predictions)
    }

    /// Write the trained parameters.
    fn save(&self, _destination: &mut dyn Write) -> Result<()> {
        Err(Error::Unsupported("model does not support saving".to_string()))
    }

    /// Replace the trained parameters with ones previously written by `save`.
    fn load(&mut self, _source: &mut dyn Read) -> Result<()> {
        Err(Error::Unsupported("model does not support loading".to_string()))
    }
}

/// Builds fresh, untrained models from fixed hyperparameters.
///
/// Any `Fn(&Hyperparameters) -> Result<M>` closure is a factory.
pub trait ModelFactory: Sync {
    type Model: Model;

    fn build(&self, hyperparameters: &Hyperparameters) -> Result<Self::Model>;
}

impl<F, M> ModelFactory for F
where
    F: Fn(&Hyperparameters) -> Result<M> + Sync,
    M: Model,
{
    type Model = M;

    fn build(&self, hyperparameters: &Hyperparameters) -> Result<M> {
        self(hyperparameters)
    }
}

pub(crate) fn check_target_len(features: &FeatureTable, target: &[f64]) -> Result<()> {
    if features.n_rows() != target.len() {
        return Err(Error::InvalidParameter(format!(
            "{} feature rows but {} target values",
            features.n_rows(),
            target.len()
        )));
    }
    if target.is_empty() {
        return Err(Error::InvalidParameter("cannot fit on zero rows".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl Model for Constant {
        fn fit(&mut self, _features: &FeatureTable, target: &[f64]) -> Result<()> {
            self.0 = target.iter().sum::<f64>() / target.len() as f64;
            Ok(())
        }

        fn predict(&self, features: &FeatureTable) -> Result<Vec<f64>> {
            Ok(vec![self.0; features.n_rows()])
        }
    }

    fn table() -> FeatureTable {
        FeatureTable::new(
            vec!["a".into(), "b".into()],
            DMatrix::from_row_slice(3, 2, &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0]),
        )
        .unwrap()
    }

    #[test]
    fn evaluate_defaults_to_mean_squared_error() {
        let mut model = Constant(0.0);
        model.fit(&table(), &[1.0, 2.0, 3.0]).unwrap();
        let mse = model.evaluate(&table(), &[1.0, 2.0, 3.0]).unwrap();
        assert!((mse - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn persistence_is_optional() {
        let mut buf: Vec<u8> = Vec::new();
        assert!(matches!(
            Constant(1.0).save(&mut buf),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn closures_are_factories() {
        let factory = |_: &Hyperparameters| -> Result<Constant> { Ok(Constant(0.0)) };
        let model = factory.build(&Hyperparameters::new()).unwrap();
        assert_eq!(model.0, 0.0);
    }

    #[test]
    fn select_rows_keeps_names_and_order() {
        let sub = table().select_rows(&[2, 0]);
        assert_eq!(sub.names(), table().names());
        assert_eq!(sub.column("b").unwrap(), vec![30.0, 10.0]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = FeatureTable::new(vec!["a".into(), "a".into()], DMatrix::zeros(1, 2));
        assert!(matches!(err, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn target_requires_every_value() {
        let frame = DataFrame::new(vec![crate::frame::number_column(
            "price",
            vec![Some(1.0), None],
        )])
        .unwrap();
        assert!(matches!(
            target_from_frame(&frame, "price"),
            Err(Error::MissingValue { row: 1, .. })
        ));
    }
}
