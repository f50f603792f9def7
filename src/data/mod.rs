//! Data sources.
//!
//! Real datasets come in through `io::ingest`; this module only generates
//! synthetic ones with a known underlying line.

pub mod synthetic;

pub use synthetic::*;
