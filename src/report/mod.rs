//! Plain-text reports for terminals and logs.

pub mod format;

pub use format::*;
