//! Mathematical utilities: nonlinear least squares and robust summaries.

pub mod lm;
pub mod stats;

pub use lm::*;
pub use stats::*;
