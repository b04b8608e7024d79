//! Data sources bundled with the crate.
//!
//! Real listings and index observations are loaded by the caller; the only
//! source here is the seeded synthetic generator used by tests and demos.

pub mod sample;

pub use sample::*;
