//! Input/output helpers.
//!
//! - dataset ingest + validation (`ingest`)
//! - run directory creation and overwrite protection (`workdir`)
//! - result bundle JSON/CSV read/write (`bundle`)

pub mod bundle;
pub mod ingest;
pub mod workdir;

pub use bundle::*;
pub use ingest::*;
pub use workdir::*;
