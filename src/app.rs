//! Top-level workflow orchestration.
//!
//! The library has no binary: callers load listings and index observations
//! themselves, then use `pipeline::prepare_dataset` to get a model-ready table
//! and hand it to `eval`.

pub mod pipeline;

pub use pipeline::{DatasetConfig, PreparedDataset, StageCounts, prepare_dataset};
