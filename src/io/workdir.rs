//! Output directory handling.

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::domain::RunConfig;
use crate::error::OrthoError;

/// Create `output_dir/run_name/` and return its path.
///
/// An existing directory is only reused when `overwrite` is set.
pub fn prepare_run_dir(config: &RunConfig) -> Result<PathBuf, OrthoError> {
    let dir = config.run_dir();

    if dir.exists() {
        if !config.overwrite {
            return Err(OrthoError::config(format!(
                "output directory '{}' already exists; choose another run name or pass --overwrite",
                dir.display()
            )));
        }
        if !dir.is_dir() {
            return Err(OrthoError::config(format!("'{}' exists and is not a directory", dir.display())));
        }
        warn!(dir = %dir.display(), "reusing existing run directory");
    }

    fs::create_dir_all(&dir).map_err(|e| OrthoError::io(&dir, e))?;
    info!(dir = %dir.display(), "run directory ready");
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(parent: &std::path::Path) -> RunConfig {
        let mut config = RunConfig::new("data.txt", "run-a");
        config.output_dir = parent.to_path_buf();
        config
    }

    #[test]
    fn creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = prepare_run_dir(&config_in(tmp.path())).unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir, tmp.path().join("run-a"));
    }

    #[test]
    fn collision_requires_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config_in(tmp.path());
        prepare_run_dir(&config).unwrap();

        let err = prepare_run_dir(&config).unwrap_err();
        assert!(matches!(err, OrthoError::Configuration(_)), "{err}");

        config.overwrite = true;
        assert!(prepare_run_dir(&config).is_ok());
    }
}
