//! Row filters applied after the feature pipeline.

use log::debug;
use polars::prelude::*;

use crate::domain::{ColumnGroup, OutlierCutoff};
use crate::error::Result;
use crate::frame::{column_names, contains, drop_columns, missing_cells, require_dtype};
use crate::listings::grouping::ColumnGroupMap;
use crate::listings::pipeline::{TIME_NORMALIZED_PRICE_PER_SQFT, sentinel_name};

/// Drop rows whose `timeNormalizedPricePerSqFt` lies outside `[low, high]`.
///
/// Rows without a value are kept: a missing value is not evidence of an
/// outlier. Only rows are removed, so applying the same cutoff again is a no-op.
pub fn drop_outliers(frame: &DataFrame, cutoff: &OutlierCutoff) -> Result<DataFrame> {
    cutoff.validate()?;
    require_dtype(
        frame,
        TIME_NORMALIZED_PRICE_PER_SQFT,
        "outlier filter",
        &DataType::Float64,
    )?;
    let ratio = col(TIME_NORMALIZED_PRICE_PER_SQFT);
    let in_band = ratio
        .clone()
        .is_null()
        .or(ratio.clone().gt_eq(lit(cutoff.low)).and(ratio.lt_eq(lit(cutoff.high))));
    let out = frame.clone().lazy().filter(in_band).collect()?;
    debug!(
        "outlier filter [{}, {}]: {} -> {} rows",
        cutoff.low,
        cutoff.high,
        frame.height(),
        out.height()
    );
    Ok(out)
}

/// Drop rows where any key prediction feature was imputed.
///
/// For every column mapped to `keyPredictionFeatures` that has a paired `_nan`
/// sentinel, rows flagged by the sentinel are removed, then the sentinel
/// itself. Sentinels of other columns are left alone.
pub fn drop_missing_key_features(frame: &DataFrame, map: &ColumnGroupMap) -> Result<DataFrame> {
    let key_columns: Vec<String> = column_names(frame)
        .into_iter()
        .filter(|c| map.get(c) == Some(ColumnGroup::KeyPredictionFeatures))
        .filter(|c| contains(frame, &sentinel_name(c)))
        .collect();
    let sentinels: Vec<String> = key_columns.iter().map(|c| sentinel_name(c)).collect();

    for sentinel in &sentinels {
        require_dtype(frame, sentinel, "key feature filter", &DataType::Float64)?;
    }
    let observed = sentinels
        .iter()
        .map(|s| col(s.as_str()).neq(lit(1.0)))
        .reduce(|a, b| a.and(b));
    let kept = match observed {
        Some(observed) => frame.clone().lazy().filter(observed).collect()?,
        None => frame.clone(),
    };
    let out = drop_columns(kept, &sentinels)?;
    debug!(
        "key feature filter on {:?}: {} -> {} rows",
        key_columns,
        frame.height(),
        out.height()
    );
    Ok(out)
}

/// Count rows with a missing value in `column`.
pub fn missing_count(frame: &DataFrame, column: &str) -> Result<usize> {
    missing_cells(frame, column, "missing count")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::frame::{number_column, numbers};

    fn frame() -> DataFrame {
        let dense = |name: &str, v: [f64; 6]| number_column(name, v.map(Some).to_vec());
        DataFrame::new(vec![
            number_column(
                TIME_NORMALIZED_PRICE_PER_SQFT,
                vec![Some(0.1), Some(0.2), Some(1.0), None, Some(2.0), Some(2.5)],
            ),
            dense("bedrooms", [3.0, 0.0, 2.0, 4.0, 0.0, 3.0]),
            dense("bedrooms_nan", [0.0, 1.0, 0.0, 0.0, 1.0, 0.0]),
            dense("bathrooms", [2.0, 1.0, 0.0, 2.0, 1.0, 1.0]),
            dense("bathrooms_nan", [0.0, 0.0, 1.0, 0.0, 0.0, 0.0]),
        ])
        .unwrap()
    }

    #[test]
    fn outliers_outside_the_inclusive_band_are_dropped() {
        let out = drop_outliers(&frame(), &OutlierCutoff::default()).unwrap();
        assert_eq!(
            numbers(&out, TIME_NORMALIZED_PRICE_PER_SQFT, "test").unwrap(),
            vec![Some(0.2), Some(1.0), None, Some(2.0)]
        );
    }

    #[test]
    fn outlier_filter_is_idempotent() {
        let cutoff = OutlierCutoff::new(0.5, 2.2).unwrap();
        let once = drop_outliers(&frame(), &cutoff).unwrap();
        let twice = drop_outliers(&once, &cutoff).unwrap();
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn outlier_filter_rejects_inverted_cutoff() {
        let cutoff = OutlierCutoff {
            low: 2.0,
            high: 1.0,
        };
        assert!(matches!(
            drop_outliers(&frame(), &cutoff),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn only_key_feature_sentinels_drop_rows() {
        let map = ColumnGroupMap::from_pairs([
            ("bedrooms", ColumnGroup::KeyPredictionFeatures),
            ("bathrooms", ColumnGroup::AuxiliaryPredictionFeatures),
        ]);
        let out = drop_missing_key_features(&frame(), &map).unwrap();
        assert_eq!(out.height(), 4);
        assert!(!contains(&out, "bedrooms_nan"));
        assert!(contains(&out, "bathrooms_nan"));
        assert_eq!(
            numbers(&out, "bedrooms", "test").unwrap(),
            vec![Some(3.0), Some(2.0), Some(4.0), Some(3.0)]
        );
    }

    #[test]
    fn missing_count_counts_absent_cells() {
        assert_eq!(missing_count(&frame(), TIME_NORMALIZED_PRICE_PER_SQFT).unwrap(), 1);
        assert_eq!(missing_count(&frame(), "bedrooms").unwrap(), 0);
    }
}
