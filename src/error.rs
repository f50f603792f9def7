//! Error taxonomy for the whole crate.
//!
//! Every variant maps to a process exit code so the binary can report failures
//! the same way regardless of which layer raised them.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrthoError {
    /// Invalid run parameters, detected before any fitting starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("insufficient data: n={n} leaves no degrees of freedom for 3 parameters")]
    InsufficientData { n: usize },

    #[error("trial {trial} failed to converge: {message}")]
    ConvergenceFailure { trial: usize, message: String },

    #[error("only {valid} bootstrap trials converged; at least 2 are needed for dispersion statistics")]
    InsufficientTrials { valid: usize },
}

impl OrthoError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) | Self::Parse { .. } | Self::Io { .. } | Self::Serialization(_) => 2,
            Self::InsufficientData { .. } => 3,
            Self::ConvergenceFailure { .. } | Self::InsufficientTrials { .. } => 4,
        }
    }
}
