//! `ortho-censored` library crate.
//!
//! Orthogonal (perpendicular-distance) line fitting in log space for data
//! that may carry upper limits on either axis, with bootstrap uncertainties.
//!
//! The binary (`ortho`) is a thin wrapper around this library so that the
//! fitting core is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
