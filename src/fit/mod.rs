//! Fitting orchestration.
//!
//! Responsibilities:
//!
//! - draw the seeded bootstrap index matrix
//! - run one minimization per dataset (original + each resample, in parallel)
//! - reduce the ensemble to summary statistics

pub mod bootstrap;
pub mod driver;
pub mod resample;
pub mod summary;

pub use bootstrap::*;
pub use driver::*;
pub use resample::*;
pub use summary::*;
