use approx::assert_relative_eq;

use hopus::app::{DatasetConfig, prepare_dataset};
use hopus::data::{SampleConfig, generate_sample};
use hopus::domain::{
    CvConfig, ExperimentConfig, Hyperparameters, IndexConfig, IndexObservation, Month,
    OutlierCutoff, RawListing, TargetKind,
};
use hopus::eval::{ExperimentRunner, cross_validate, hpi_mse, hpi_rmse, k_fold};
use hopus::frame::numbers;
use hopus::index::IndexSeries;
use hopus::io::{write_frame_csv, write_records_csv};
use hopus::listings::{LOG_PRICE, TIME_NORMALIZED_PRICE_PER_SQFT, drop_outliers};
use hopus::models::{LinearRegression, PricePerSqFtBaseline};
use hopus::report::{format_dataset_summary, format_records};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn month(year: i32, m: u32) -> Month {
    Month::new(year, m).unwrap()
}

/// 15 months from January 2023, rising by one point a month.
fn observations() -> Vec<IndexObservation> {
    (0..15)
        .map(|i| IndexObservation::new(month(2023, 1).offset(i), 300.0 + i as f64))
        .collect()
}

fn listing(i: usize, kind: &str, sqft: f64, price: f64) -> RawListing {
    RawListing::new()
        .with("id", format!("listing-{i}"))
        .with("propertyType", kind)
        .with("squareFootage", sqft)
        .with("lotSize", 5000 + 100 * i as i64)
        .with("bedrooms", 3)
        .with("bathrooms", 2)
        .with("yearBuilt", 1980 + i as i64)
        .with("lastSalePrice", price)
        .with("lastSaleDate", format!("2023-{:02}-15T00:00:00.000Z", 4 + i % 6))
        .with_feature("unitCount", 1)
        .with_feature("floorCount", 2)
        .with_feature("garageSpaces", 1)
        .with_feature("roomCount", 7)
}

/// 3 single-family homes and 9 listings of other types.
fn listings() -> Vec<RawListing> {
    let mut out = vec![
        listing(0, "Single Family", 1500.0, 450_000.0),
        listing(1, "Single Family", 2000.0, 640_000.0),
        listing(2, "Single Family", 1200.0, 330_000.0),
    ];
    for (i, kind) in ["Condo", "Townhouse", "Multi-Family", "Apartment", "Manufactured"]
        .iter()
        .cycle()
        .take(9)
        .enumerate()
    {
        out.push(listing(3 + i, kind, 900.0, 250_000.0));
    }
    out
}

#[test]
fn twelve_listings_reduce_to_the_three_single_family_homes() {
    init_logging();
    let raw = listings();
    assert_eq!(raw.len(), 12);

    let prepared = prepare_dataset(&raw, &observations(), &DatasetConfig::default()).unwrap();
    assert_eq!(prepared.counts.raw, 12);
    assert_eq!(prepared.counts.processed, 3);
    assert_eq!(prepared.counts.without_outliers, 3);

    let frame = &prepared.frame;
    let price = numbers(frame, "price", "test").unwrap();
    let log_price = numbers(frame, LOG_PRICE, "test").unwrap();
    for (p, l) in price.iter().zip(log_price) {
        assert_relative_eq!(l.unwrap(), p.unwrap().ln(), epsilon = 1e-12);
    }
    for v in numbers(frame, TIME_NORMALIZED_PRICE_PER_SQFT, "test").unwrap() {
        let v = v.unwrap();
        assert!((0.2..=2.0).contains(&v), "{v} outside the default band");
    }
    for column in ["sqFt", "lotSize"] {
        assert!(numbers(frame, column, "test").unwrap().iter().all(Option::is_some));
    }
    for sentinel in ["bedrooms_nan", "bathrooms_nan", "yearBuilt_nan"] {
        assert!(numbers(frame, sentinel, "test").unwrap().iter().all(|v| *v == Some(0.0)));
    }

    let again = drop_outliers(frame, &OutlierCutoff::default()).unwrap();
    assert!(again.equals_missing(frame));
}

#[test]
fn lag_error_is_a_non_negative_root() {
    let prepared = prepare_dataset(&listings(), &observations(), &DatasetConfig::default()).unwrap();
    for target in [TargetKind::Price, TargetKind::LogPrice] {
        let mse = hpi_mse(&prepared.frame, target).unwrap();
        assert!(mse >= 0.0);
        assert_relative_eq!(hpi_rmse(&prepared.frame, target).unwrap(), mse.sqrt());
    }
}

#[test]
fn predicted_value_adds_the_full_series_correction() {
    let values: Vec<f64> = (0..12).map(|i| 200.0 + (i * i) as f64).collect();
    let obs: Vec<IndexObservation> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| IndexObservation::new(month(2022, 1).offset(i as i64), v))
        .collect();
    let series = IndexSeries::build(&obs, &IndexConfig::default()).unwrap();

    let april = series.get(month(2022, 4)).unwrap();
    assert_relative_eq!(april.available_value, values[0]);
    assert_relative_eq!(april.predicted_value, values[0] + series.mean_delta(4).unwrap());
    assert!(series.get(month(2022, 3)).is_none());
}

#[test]
fn cross_validation_is_reproducible_on_sample_data() {
    init_logging();
    let sample = generate_sample(&SampleConfig::default()).unwrap();
    let config = DatasetConfig {
        drop_missing_key_features: true,
        ..DatasetConfig::default()
    };
    let prepared = prepare_dataset(&sample.listings, &sample.observations, &config).unwrap();
    let features = prepared.features().unwrap();
    let target = prepared.target(TargetKind::Price).unwrap();

    let folds = k_fold(features.n_rows(), 5, 99).unwrap();
    let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.iter().copied()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..features.n_rows()).collect::<Vec<_>>());

    let factory = |_: &Hyperparameters| -> hopus::error::Result<PricePerSqFtBaseline> {
        Ok(PricePerSqFtBaseline::default())
    };
    let cv = CvConfig {
        seed: 99,
        ..CvConfig::default()
    };
    let a = cross_validate(&factory, &Hyperparameters::new(), &features, &target, &cv).unwrap();
    let b = cross_validate(&factory, &Hyperparameters::new(), &features, &target, &cv).unwrap();
    assert_eq!(a.folds, b.folds);
    assert_eq!(a.test_mse, b.test_mse);
    assert_eq!(a.models.len(), 5);
}

#[test]
fn experiment_records_render_and_export() {
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
        n_experiments: 3,
        n_splits: 4,
        parallel: false,
    };
    let runner = ExperimentRunner::new(&factory, Hyperparameters::new(), experiment).unwrap();
    let records = runner.run_all(&features, &target).unwrap();
    assert_eq!(records.len(), 3);

    let table = format_records(&records).unwrap();
    assert_eq!(table.lines().count(), 5);

    let mut csv = Vec::new();
    write_records_csv(&mut csv, &records).unwrap();
    let csv = String::from_utf8(csv).unwrap();
    assert!(csv.starts_with("n_splits,seed,train_cv_mse,test_cv_mse\n"));
    assert_eq!(csv.lines().count(), 4);

    let mut frame_csv = Vec::new();
    write_frame_csv(&mut frame_csv, &prepared.frame).unwrap();
    assert_eq!(
        String::from_utf8(frame_csv).unwrap().lines().count(),
        prepared.frame.height() + 1
    );

    assert!(format_dataset_summary(&prepared).contains("complete="));
}
