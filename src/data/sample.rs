//! Synthetic listings and index series.
//!
//! Produces data shaped like the real inputs (RentCast-style listing records
//! and a monthly Case-Shiller-style index) so that the whole pipeline can run
//! without any external source. Generation is fully determined by the seed.
//!
//! Prices follow `price = rate * sqFt * index(sale month)` with a log-normal
//! `rate` around 1, so `timeNormalizedPricePerSqFt` is close to 1 except for
//! a small share of injected outliers.

use std::f64::consts::PI;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde_json::Value;

use crate::domain::{IndexObservation, Month, RawListing};
use crate::error::{Error, Result};

/// Annual amplitude of the seasonal swing in the index (log scale).
const SEASONAL_AMPLITUDE: f64 = 0.015;
/// Monthly log drift of the index.
const MONTHLY_DRIFT: f64 = 0.004;

const OTHER_TYPES: [&str; 4] = ["Condo", "Townhouse", "Multi-Family", "Apartment"];
const EXTERIOR_TYPES: [&str; 4] = ["Brick", "Wood", "Stucco", "Vinyl Siding"];
const ROOF_TYPES: [&str; 3] = ["Asphalt", "Metal", "Tile"];

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub n_listings: usize,
    /// First month of the index series.
    pub start_year: i32,
    pub start_month: u32,
    pub n_months: usize,
    /// Index value in the first month.
    pub index_level: f64,
    pub seed: u64,
    /// Share of listings that are single-family homes.
    pub single_family_share: f64,
    /// Share of missing values in the optional attributes.
    pub missing_share: f64,
    /// Share of listings whose price is pushed far outside the usual band.
    pub outlier_share: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            n_listings: 200,
            start_year: 2022,
            start_month: 1,
            n_months: 36,
            index_level: 300.0,
            seed: 2026,
            single_family_share: 0.7,
            missing_share: 0.05,
            outlier_share: 0.02,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleData {
    pub observations: Vec<IndexObservation>,
    pub listings: Vec<RawListing>,
}

pub fn generate_sample(config: &SampleConfig) -> Result<SampleData> {
    let start = Month::new(config.start_year, config.start_month).ok_or_else(|| {
        Error::InvalidParameter(format!("invalid start month {}", config.start_month))
    })?;
    if config.n_months == 0 {
        return Err(Error::InvalidParameter("sample needs at least one month".to_string()));
    }
    for (name, share) in [
        ("single_family_share", config.single_family_share),
        ("missing_share", config.missing_share),
        ("outlier_share", config.outlier_share),
    ] {
        if !(0.0..=1.0).contains(&share) {
            return Err(Error::InvalidParameter(format!(
                "{name} must be in [0, 1], got {share}"
            )));
        }
    }
    if !(config.index_level.is_finite() && config.index_level > 0.0) {
        return Err(Error::InvalidParameter("index level must be positive".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let observations = index_series(&mut rng, config, start)?;
    let listings = (0..config.n_listings)
        .map(|i| listing(&mut rng, config, &observations, i))
        .collect::<Result<Vec<_>>>()?;

    Ok(SampleData {
        observations,
        listings,
    })
}

fn index_series(
    rng: &mut StdRng,
    config: &SampleConfig,
    start: Month,
) -> Result<Vec<IndexObservation>> {
    let noise = Normal::new(0.0_f64, 0.002)
        .map_err(|e| Error::InvalidParameter(format!("index noise distribution: {e}")))?;
    let mut log_level = config.index_level.ln();
    Ok((0..config.n_months)
        .map(|m| {
            let month = start.offset(m as i64);
            let season = SEASONAL_AMPLITUDE * (2.0 * PI * f64::from(month.month()) / 12.0).sin();
            if m > 0 {
                log_level += MONTHLY_DRIFT + noise.sample(rng);
            }
            IndexObservation::new(month, (log_level + season).exp())
        })
        .collect())
}

fn listing(
    rng: &mut StdRng,
    config: &SampleConfig,
    observations: &[IndexObservation],
    i: usize,
) -> Result<RawListing> {
    let rate_noise = Normal::new(0.0_f64, 0.15)
        .map_err(|e| Error::InvalidParameter(format!("price noise distribution: {e}")))?;

    let single_family = rng.gen_bool(config.single_family_share);
    let property_type = if single_family {
        "Single Family"
    } else {
        OTHER_TYPES.choose(rng).copied().unwrap_or("Condo")
    };

    let sale = observations[rng.gen_range(0..observations.len())];
    let day: u32 = rng.gen_range(1..=28);
    let sale_date = format!(
        "{:04}-{:02}-{day:02}T00:00:00.000Z",
        sale.month.year(),
        sale.month.month()
    );

    let sqft = f64::from(rng.gen_range(8..=35_i32) * 100);
    let mut rate = rate_noise.sample(rng).exp();
    if rng.gen_bool(config.outlier_share) {
        rate *= if rng.gen_bool(0.5) { 3.0 } else { 0.1 };
    }
    let price = (rate * sqft * sale.true_value / 1000.0).round() * 1000.0;

    let missing = |rng: &mut StdRng| rng.gen_bool(config.missing_share);
    let bedrooms: Value = if missing(rng) {
        Value::Null
    } else {
        rng.gen_range(1..=5_i64).into()
    };
    let year_built: Value = if missing(rng) {
        Value::Null
    } else {
        rng.gen_range(1940..=2022_i64).into()
    };

    let mut record = RawListing::new()
        .with("id", format!("sample-{i:04}"))
        .with("formattedAddress", format!("{} Sample St, Austin, TX 78701", 100 + i))
        .with("city", "Austin")
        .with("state", "TX")
        .with("zipCode", "78701")
        .with("latitude", 30.2 + rng.gen_range(0.0..0.2))
        .with("longitude", -97.8 + rng.gen_range(0.0..0.2))
        .with("propertyType", property_type)
        .with("bedrooms", bedrooms)
        .with("bathrooms", f64::from(rng.gen_range(2..=8_i32)) / 2.0)
        .with("squareFootage", sqft)
        .with("lotSize", rng.gen_range(20..=120_i64) * 100)
        .with("yearBuilt", year_built)
        .with("ownerOccupied", rng.gen_bool(0.6))
        .with("lastSaleDate", sale_date)
        .with("lastSalePrice", price);

    let units = match property_type {
        "Multi-Family" | "Apartment" => rng.gen_range(2..=8_i64),
        _ => 1,
    };
    record = record
        .with_feature("unitCount", units)
        .with_feature("floorCount", rng.gen_range(1..=3_i64))
        .with_feature("roomCount", rng.gen_range(4..=12_i64))
        .with_feature("garage", rng.gen_bool(0.7));
    if !missing(rng) {
        record = record.with_feature("garageSpaces", rng.gen_range(0..=3_i64));
    }
    if !missing(rng) {
        record = record.with_feature(
            "exteriorType",
            EXTERIOR_TYPES.choose(rng).copied().unwrap_or("Brick"),
        );
    }
    if !missing(rng) {
        record = record.with_feature("roofType", ROOF_TYPES.choose(rng).copied().unwrap_or("Asphalt"));
    }
    Ok(record)
}
