//! Home price index processing (publication lag + seasonal correction).

pub mod series;

pub use series::*;
