//! Shared dataset preparation used by every entry point.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! index processing -> listing pipeline -> outlier filter -> key-feature filter -> grouping
//!
//! Callers (tests, notebooks, experiment scripts) then only choose the model
//! and the evaluation settings.

use log::info;
use polars::prelude::DataFrame;

use crate::domain::{IndexConfig, IndexObservation, OutlierCutoff, PipelineConfig, RawListing, TargetKind};
use crate::error::Result;
use crate::index::IndexSeries;
use crate::listings::{
    ColumnGroupMap, ColumnGrouping, drop_missing_key_features, drop_outliers, group_columns,
    preprocess,
};
use crate::models::{FeatureTable, target_from_frame};

/// Everything `prepare_dataset` needs.
#[derive(Debug, Clone, Default)]
pub struct DatasetConfig {
    pub index: IndexConfig,
    pub pipeline: PipelineConfig,
    pub outlier_cutoff: OutlierCutoff,
    /// Drop rows where a key prediction feature had to be imputed.
    pub drop_missing_key_features: bool,
    /// Column -> group mapping; `None` uses the bundled one.
    pub column_groups: Option<ColumnGroupMap>,
}

/// Row counts after each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageCounts {
    pub raw: usize,
    pub processed: usize,
    pub without_outliers: usize,
    pub complete_key_features: usize,
}

/// All outputs of one preparation run.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub frame: DataFrame,
    pub index: IndexSeries,
    pub grouping: ColumnGrouping,
    pub counts: StageCounts,
}

impl PreparedDataset {
    /// All key and auxiliary prediction features.
    pub fn features(&self) -> Result<FeatureTable> {
        FeatureTable::from_frame(&self.frame, &self.grouping.prediction_features())
    }

    /// Only the named feature columns.
    pub fn select_features(&self, columns: &[String]) -> Result<FeatureTable> {
        FeatureTable::from_frame(&self.frame, columns)
    }

    pub fn target(&self, target: TargetKind) -> Result<Vec<f64>> {
        target_from_frame(&self.frame, target.column_name())
    }
}

/// Run the full preparation workflow.
pub fn prepare_dataset(
    listings: &[RawListing],
    observations: &[IndexObservation],
    config: &DatasetConfig,
) -> Result<PreparedDataset> {
    let map = match &config.column_groups {
        Some(map) => map.clone(),
        None => ColumnGroupMap::bundled()?,
    };

    let index = IndexSeries::build(observations, &config.index)?;
    let processed = preprocess(listings, &index, &config.pipeline)?;
    let n_processed = processed.height();

    let filtered = drop_outliers(&processed, &config.outlier_cutoff)?;
    let n_filtered = filtered.height();

    let frame = if config.drop_missing_key_features {
        drop_missing_key_features(&filtered, &map)?
    } else {
        filtered
    };

    let grouping = group_columns(&frame, &map)?;
    let counts = StageCounts {
        raw: listings.len(),
        processed: n_processed,
        without_outliers: n_filtered,
        complete_key_features: frame.height(),
    };
    info!(
        "prepared dataset: {} raw -> {} processed -> {} without outliers -> {} complete",
        counts.raw, counts.processed, counts.without_outliers, counts.complete_key_features
    );

    Ok(PreparedDataset {
        frame,
        index,
        grouping,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleConfig, generate_sample};
    use crate::domain::ColumnGroup;

    #[test]
    fn sample_data_prepares_end_to_end() {
        let sample = generate_sample(&SampleConfig::default()).unwrap();
        let config = DatasetConfig {
            drop_missing_key_features: true,
            ..DatasetConfig::default()
        };
        let prepared = prepare_dataset(&sample.listings, &sample.observations, &config).unwrap();

        let c = prepared.counts;
        assert!(c.raw >= c.processed);
        assert!(c.processed >= c.without_outliers);
        assert!(c.without_outliers >= c.complete_key_features);
        assert!(c.complete_key_features > 0);

        assert!(!crate::frame::contains(&prepared.frame, "bedrooms_nan"));
        assert_eq!(
            prepared.grouping.group_of("price"),
            Some(ColumnGroup::Target)
        );

        let features = prepared.features().unwrap();
        assert_eq!(features.n_rows(), c.complete_key_features);
        assert!(features.names().iter().any(|n| n == "sqFt"));
        assert!(!features.names().iter().any(|n| n == "price" || n == "logPrice"));
        assert_eq!(prepared.target(TargetKind::LogPrice).unwrap().len(), features.n_rows());
    }

    #[test]
    fn prepared_sample_runs_through_evaluation() {
        use crate::domain::{ExperimentConfig, Hyperparameters};
        use crate::eval::{ExperimentRunner, hpi_rmse};
        use crate::models::LinearRegression;
        use crate::report::format_records;

        let sample = generate_sample(&SampleConfig::default()).unwrap();
        let config = DatasetConfig {
            drop_missing_key_features: true,
            ..DatasetConfig::default()
        };
        let prepared = prepare_dataset(&sample.listings, &sample.observations, &config).unwrap();
        let features = prepared.features().unwrap();
        let target = prepared.target(TargetKind::LogPrice).unwrap();

        let factory = |p: &Hyperparameters| LinearRegression::from_hyperparameters(p);
        let experiment = ExperimentConfig {
            n_experiments: 2,
            n_splits: 5,
            parallel: true,
        };
        let runner = ExperimentRunner::new(&factory, Hyperparameters::new(), experiment).unwrap();
        let records = runner.run_with_seeds(&features, &target, &[1, 2]).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.train_cv_mse.is_finite() && r.test_cv_mse >= 0.0));

        let table = format_records(&records).unwrap();
        assert_eq!(table.lines().count(), 4);

        let lag_error = hpi_rmse(&prepared.frame, TargetKind::LogPrice).unwrap();
        assert!(lag_error.is_finite() && lag_error >= 0.0);
    }

    #[test]
    fn explicit_map_must_cover_every_column() {
        let sample = generate_sample(&SampleConfig {
            n_listings: 30,
            ..SampleConfig::default()
        })
        .unwrap();
        let config = DatasetConfig {
            column_groups: Some(ColumnGroupMap::from_pairs([("price", ColumnGroup::Target)])),
            ..DatasetConfig::default()
        };
        assert!(matches!(
            prepare_dataset(&sample.listings, &sample.observations, &config),
            Err(crate::error::Error::UnmappedColumn(_))
        ));
    }
}
