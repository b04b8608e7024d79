//! Listing feature pipeline.
//!
//! Turns raw listings into the model-ready feature table. The stages run in a
//! fixed order because later stages read columns produced by earlier ones:
//!
//! 1.  keep single-family homes, drop the property-type column
//! 2.  drop listings without square footage or lot size
//! 3.  (rows are compacted by every filter, so no explicit reindex is needed)
//! 4.  rename raw fields to canonical names
//! 5.  expand the nested features mapping into `features_*` columns
//! 6.  drop listings whose unit count exceeds the single-family maximum
//! 7.  (compacted again)
//! 8.  zero-impute numeric prediction features, with `_nan` sentinels
//! 9.  median-impute year built, with a `_nan` sentinel
//! 10. normalize the sale date to its month
//! 11. derive `saleMonth` / `saleYear`
//! 12. inner-join the index series by sale month
//! 13. price per square foot, and its index-normalized version
//! 14. log price
//!
//! Every stage takes a frame by value and returns a new one.

use log::{debug, warn};
use polars::prelude::*;

use crate::domain::{Month, PipelineConfig, RawListing};
use crate::error::{Error, Result};
use crate::frame::{contains, month_column, months, number_column, numbers, require, require_dtype, texts};
use crate::index::{INDEX_AVAILABLE, INDEX_DATE, INDEX_PREDICTED, INDEX_TRUE, IndexSeries};
use crate::io::ingest::listings_to_frame;
use crate::listings::features::{FEATURE_PREFIX, expand_features};
use crate::math::median;

pub const SALE_MONTH: &str = "saleMonth";
pub const SALE_YEAR: &str = "saleYear";
pub const TRUE_INDEX: &str = "trueValueHomePriceIndex";
pub const AVAILABLE_INDEX: &str = "availableValueHomePriceIndex";
pub const PREDICTED_INDEX: &str = "predictedValueHomePriceIndex";
pub const PRICE_PER_SQFT: &str = "pricePerSqFt";
pub const TIME_NORMALIZED_PRICE_PER_SQFT: &str = "timeNormalizedPricePerSqFt";
pub const LOG_PRICE: &str = "logPrice";

/// Suffix of the 0/1 column recording that a value was imputed.
pub const MISSING_SUFFIX: &str = "_nan";

/// Keeps the listing order through the index join.
const ROW_ORDER: &str = "__row";

/// Name of the sentinel column paired with `column`.
pub fn sentinel_name(column: &str) -> String {
    format!("{column}{MISSING_SUFFIX}")
}

/// Run the whole pipeline on raw listings.
///
/// `listings` is only read; the result is a fresh frame.
pub fn preprocess(
    listings: &[RawListing],
    index: &IndexSeries,
    config: &PipelineConfig,
) -> Result<DataFrame> {
    let frame = listings_to_frame(listings, &config.features_column)?;
    preprocess_frame(frame, index, config)
}

/// Run the whole pipeline on an already ingested listing frame.
pub fn preprocess_frame(
    frame: DataFrame,
    index: &IndexSeries,
    config: &PipelineConfig,
) -> Result<DataFrame> {
    let n_raw = frame.height();

    let frame = keep_single_family(frame, config)?;
    log_stage("single-family filter", n_raw, &frame);

    let before = frame.height();
    let frame = drop_missing_sizes(frame, config)?;
    log_stage("size completeness", before, &frame);

    let frame = rename_columns(frame, config)?;
    let frame = expand_features(frame, &config.features_column)?;

    let before = frame.height();
    let frame = drop_multi_unit(frame, config)?;
    log_stage("unit count filter", before, &frame);

    let frame = fill_missing_with_zero(frame, &config.zero_fill_columns)?;
    let frame = fill_missing_with_median(frame, &config.median_fill_column)?;
    let frame = normalize_sale_date(frame, &config.sale_date_column)?;
    let frame = split_sale_date(frame, &config.sale_date_column)?;

    let before = frame.height();
    let frame = merge_index(frame, index, &config.sale_date_column)?;
    log_stage("index merge", before, &frame);

    let frame = price_per_square_foot(frame, &config.price_column, &config.sqft_column)?;
    let frame = log_price(frame, &config.price_column)?;

    debug!(
        "pipeline kept {} of {} listings, {} columns",
        frame.height(),
        n_raw,
        frame.width()
    );
    Ok(frame)
}

fn log_stage(stage: &str, before: usize, frame: &DataFrame) {
    debug!("{stage}: {before} -> {} rows", frame.height());
}

/// A generated `features_*` column exists only when some remaining listing
/// carries the key. Once the row filters have removed every listing there is
/// nothing to expand, and the column is added empty instead of reported.
fn with_generated(mut frame: DataFrame, name: &str, stage: &'static str) -> Result<DataFrame> {
    if frame.height() == 0 && name.starts_with(FEATURE_PREFIX) && !contains(&frame, name) {
        frame.with_column(number_column(name, Vec::new()))?;
    }
    require_dtype(&frame, name, stage, &DataType::Float64)?;
    Ok(frame)
}

/// Stage 1.
pub fn keep_single_family(frame: DataFrame, config: &PipelineConfig) -> Result<DataFrame> {
    let column = config.property_type_column.as_str();
    require(&frame, column, "single-family filter")?;
    // A column with no present values at all is ingested as numeric.
    let is_single_family = col(column)
        .cast(DataType::String)
        .eq(lit(config.single_family_label.as_str()));
    let kept = frame.lazy().filter(is_single_family).collect()?;
    Ok(kept.drop(column)?)
}

/// Stage 2.
pub fn drop_missing_sizes(frame: DataFrame, config: &PipelineConfig) -> Result<DataFrame> {
    for name in &config.size_columns {
        require(&frame, name, "size completeness")?;
    }
    let complete = config
        .size_columns
        .iter()
        .map(|name| col(name.as_str()).is_not_null())
        .reduce(|a, b| a.and(b));
    match complete {
        Some(complete) => Ok(frame.lazy().filter(complete).collect()?),
        None => Ok(frame),
    }
}

/// Stage 4. Every source field in the map must exist.
pub fn rename_columns(frame: DataFrame, config: &PipelineConfig) -> Result<DataFrame> {
    let mut frame = frame;
    for (from, to) in &config.renames {
        require(&frame, from, "column renaming")?;
        if from != to && contains(&frame, to) {
            return Err(Error::InvalidParameter(format!(
                "cannot rename `{from}` to existing column `{to}`"
            )));
        }
        frame.rename(from, to.as_str().into())?;
    }
    Ok(frame)
}

/// Stage 6. Listings without a unit count are kept.
pub fn drop_multi_unit(frame: DataFrame, config: &PipelineConfig) -> Result<DataFrame> {
    let column = config.unit_count_column.as_str();
    let frame = with_generated(frame, column, "unit count filter")?;
    let single_unit = col(column)
        .is_null()
        .or(col(column).lt_eq(lit(config.max_unit_count)));
    Ok(frame.lazy().filter(single_unit).collect()?)
}

/// Stage 8. For each column, record a sentinel then replace missing values with 0.
pub fn fill_missing_with_zero(frame: DataFrame, columns: &[String]) -> Result<DataFrame> {
    let frame = columns.iter().try_fold(frame, |frame, name| {
        with_generated(frame, name, "zero imputation")
    })?;
    let filled = columns
        .iter()
        .map(|name| col(name.as_str()).fill_null(lit(0.0)));
    let sentinels = columns.iter().map(|name| missing_flag(name));
    let exprs: Vec<Expr> = filled.chain(sentinels).collect();
    Ok(frame.lazy().with_columns(exprs).collect()?)
}

/// Stage 9. Replace missing values with the median of the present ones.
///
/// When no value is present there is nothing to take a median of; the column
/// is left missing and the sentinel still records every row.
pub fn fill_missing_with_median(frame: DataFrame, column: &str) -> Result<DataFrame> {
    let present: Vec<f64> = numbers(&frame, column, "median imputation")?
        .into_iter()
        .flatten()
        .collect();
    let filled = match median(&present) {
        Some(m) => col(column).fill_null(lit(m)),
        None => {
            warn!("`{column}` has no values; median imputation skipped");
            col(column)
        }
    };
    Ok(frame
        .lazy()
        .with_columns([filled, missing_flag(column)])
        .collect()?)
}

/// 0/1 sentinel named `<column>_nan`.
fn missing_flag(column: &str) -> Expr {
    col(column)
        .is_null()
        .cast(DataType::Float64)
        .alias(sentinel_name(column))
}

/// Stage 10. Parse the sale date and keep only its month.
pub fn normalize_sale_date(frame: DataFrame, column: &str) -> Result<DataFrame> {
    const STAGE: &str = "sale date normalization";
    let raw = require(&frame, column, STAGE)?;
    let all_missing = raw.null_count() == raw.len();
    let sold = match raw.dtype().clone() {
        DataType::Date => return Ok(frame),
        DataType::String => texts(&frame, column, STAGE)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                None => Ok(None),
                Some(text) => match Month::parse_date_like(&text) {
                    Some(month) => Ok(Some(month)),
                    None => Err(Error::InvalidValue {
                        column: column.to_string(),
                        row,
                        value: text,
                    }),
                },
            })
            .collect::<Result<Vec<_>>>()?,
        // All-missing dates are ingested as an empty numeric column.
        _ if all_missing => vec![None; frame.height()],
        other => {
            return Err(Error::InvalidParameter(format!(
                "sale date column `{column}` holds {other} values"
            )));
        }
    };
    let mut frame = frame;
    frame.with_column(month_column(column, &sold)?)?;
    Ok(frame)
}

/// Stage 11.
pub fn split_sale_date(frame: DataFrame, column: &str) -> Result<DataFrame> {
    let sold = months(&frame, column, "sale date split")?;
    let month_of_year = sold.iter().map(|m| m.map(|m| f64::from(m.month()))).collect();
    let year = sold.iter().map(|m| m.map(|m| f64::from(m.year()))).collect();
    let mut frame = frame;
    frame.with_column(number_column(SALE_MONTH, month_of_year))?;
    frame.with_column(number_column(SALE_YEAR, year))?;
    Ok(frame)
}

/// Stage 12. Inner join on the sale month.
///
/// Listings whose month is missing or outside the retained index range are
/// dropped; this is the designed behaviour, not an error. Listing order is
/// preserved.
pub fn merge_index(frame: DataFrame, index: &IndexSeries, column: &str) -> Result<DataFrame> {
    require_dtype(&frame, column, "index merge", &DataType::Date)?;
    let before = frame.height();

    let lookup = index.to_frame()?.lazy().select([
        col(INDEX_DATE),
        col(INDEX_TRUE).alias(TRUE_INDEX),
        col(INDEX_AVAILABLE).alias(AVAILABLE_INDEX),
        col(INDEX_PREDICTED).alias(PREDICTED_INDEX),
    ]);
    let merged = frame
        .lazy()
        .with_row_index(ROW_ORDER, None)
        .join(
            lookup,
            [col(column)],
            [col(INDEX_DATE)],
            JoinArgs::new(JoinType::Inner),
        )
        .sort([ROW_ORDER], SortMultipleOptions::default())
        .collect()?
        .drop(ROW_ORDER)?;

    let dropped = before - merged.height();
    if dropped > 0 {
        warn!(
            "{dropped} listings have no index observation for their sale month and were dropped"
        );
    }
    Ok(merged)
}

/// Stage 13.
pub fn price_per_square_foot(frame: DataFrame, price: &str, sqft: &str) -> Result<DataFrame> {
    for name in [price, sqft, TRUE_INDEX] {
        require_dtype(&frame, name, "price per square foot", &DataType::Float64)?;
    }
    Ok(frame
        .lazy()
        .with_columns([(col(price) / col(sqft)).alias(PRICE_PER_SQFT)])
        .with_columns([
            (col(PRICE_PER_SQFT) / col(TRUE_INDEX)).alias(TIME_NORMALIZED_PRICE_PER_SQFT)
        ])
        .collect()?)
}

/// Stage 14.
pub fn log_price(frame: DataFrame, price: &str) -> Result<DataFrame> {
    let logs = numbers(&frame, price, "log price")?
        .into_iter()
        .map(|p| p.map(f64::ln))
        .collect();
    let mut frame = frame;
    frame.with_column(number_column(LOG_PRICE, logs))?;
    Ok(frame)
}
