//! `hopus` library crate.
//!
//! Turns raw property listings and a monthly home price index into a
//! model-ready table, then measures model quality with seeded, repeatable
//! cross-validation. The crate has no binary so that:
//!
//! - every stage is testable without spawning processes
//! - notebooks and experiment scripts share one preparation workflow
//! - models stay pluggable behind the `Model` / `ModelFactory` traits

pub mod app;
pub mod data;
pub mod domain;
pub mod error;
pub mod eval;
pub mod frame;
pub mod index;
pub mod io;
pub mod listings;
pub mod math;
pub mod models;
pub mod report;
