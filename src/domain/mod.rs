//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input observations (`DataPoint`, `Dataset`)
//! - fit parameters and per-trial outputs (`FitParameters`, `FitResult`, `TrialRecord`)
//! - ensemble and summary records (`BootstrapEnsemble`, `SummaryStats`)
//! - the explicit run configuration (`RunConfig`)

pub mod types;

pub use types::*;
