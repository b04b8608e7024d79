//! Valuation models.
//!
//! - the `Model` / `ModelFactory` contract and the `FeatureTable` input (`capability`)
//! - ordinary least squares (`linear`)
//! - index-scaled price per square foot (`baseline`)

pub mod baseline;
pub mod capability;
pub mod linear;
pub mod params;

pub use baseline::*;
pub use capability::*;
pub use linear::*;
pub use params::*;
