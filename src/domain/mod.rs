//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input records (`RawListing`, `IndexObservation`) and the `Month` period
//! - configuration structs (`PipelineConfig`, `IndexConfig`, `OutlierCutoff`, `CvConfig`, ...)
//! - small shared vocabularies (`TargetKind`, `ColumnGroup`, `Scalar`)

pub mod types;

pub use types::*;
