//! Property listing processing.
//!
//! - the ordered feature pipeline (`pipeline`)
//! - nested features expansion (`features`)
//! - outlier and key-feature row filters (`filters`)
//! - column -> semantic group assignment (`grouping`)

pub mod features;
pub mod filters;
pub mod grouping;
pub mod pipeline;

pub use features::*;
pub use filters::*;
pub use grouping::*;
pub use pipeline::*;
