//! Likelihood model for censored orthogonal regression.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic over the minimizer.

pub mod censoring;
pub mod likelihood;

pub use censoring::*;
pub use likelihood::*;
