//! Typed access to polars frames.
//!
//! Tables are plain polars `DataFrame`s. Stages address columns by name and
//! report the crate's own errors when one is absent or holds the wrong kind
//! of value:
//!
//! - checked lookup, typed reads and column builders (`access`)
//! - dense matrices and fully present vectors for models (`matrix`)

pub mod access;
pub mod matrix;

pub use access::*;
pub use matrix::*;
