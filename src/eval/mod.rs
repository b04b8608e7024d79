//! Model evaluation.
//!
//! - seeded k-fold partitions (`folds`)
//! - cross-validation over a model factory (`cv`)
//! - repeated experiments with fresh seeds (`experiment`)
//! - the index lag error floor (`hpi`)

pub mod cv;
pub mod experiment;
pub mod folds;
pub mod hpi;

pub use cv::*;
pub use experiment::*;
pub use folds::*;
pub use hpi::*;
