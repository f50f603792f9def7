//! Terminal reporting.
//!
//! Everything here returns `String`s; printing is left to `app`.

pub mod format;

pub use format::*;
