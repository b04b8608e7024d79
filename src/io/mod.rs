//! Input/output helpers.
//!
//! - parsed records -> frames and index observations (`ingest`)
//! - experiment record and table exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
