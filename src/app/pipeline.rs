//! The `ortho fit` workflow, kept separate from printing.
//!
//! validate config -> load dataset -> prepare run dir -> draw indices ->
//! bootstrap fits -> summarize -> persist bundle
//!
//! Everything that can be rejected without fitting is rejected before the
//! first minimization starts.

use std::path::PathBuf;

use tracing::info;

use crate::domain::{BootstrapEnsemble, Dataset, PARAM_COUNT, RunConfig, SummaryStats};
use crate::error::OrthoError;
use crate::fit::{BootstrapOrchestrator, FitDriver, Resampler, summarize};
use crate::io::{ResultBundle, load_dataset, prepare_run_dir, write_bundle};
use crate::models::LikelihoodModel;

/// All computed outputs of a single `ortho fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Dataset,
    pub ensemble: BootstrapEnsemble,
    pub summary: SummaryStats,
    pub run_dir: PathBuf,
    pub bundle_path: PathBuf,
}

pub fn run_fit(config: &RunConfig) -> Result<RunOutput, OrthoError> {
    config.validate()?;

    let dataset = load_dataset(&config.dataset_path, config.x_column, config.y_column)?;
    if dataset.len() <= PARAM_COUNT {
        return Err(OrthoError::config(format!(
            "dataset has {} points; at least {} are needed to fit 3 parameters",
            dataset.len(),
            PARAM_COUNT + 1
        )));
    }

    let run_dir = prepare_run_dir(config)?;

    info!(n = dataset.len(), nboots = config.nboots, seed = config.seed, "starting bootstrap");
    let indices = Resampler::from_seed(config.seed).draw(dataset.len(), config.nboots)?;
    let orchestrator =
        BootstrapOrchestrator::new(FitDriver::new(LikelihoodModel::new(config.rho))).parallel(config.parallel);
    let ensemble = orchestrator.run(&dataset, indices)?;
    let summary = summarize(&ensemble)?;

    let bundle = ResultBundle::new(config.clone(), dataset, ensemble, summary);
    let bundle_path = write_bundle(&run_dir, &bundle)?;

    Ok(RunOutput {
        dataset: bundle.dataset,
        ensemble: bundle.ensemble,
        summary: bundle.summary,
        run_dir,
        bundle_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SimulationConfig, simulate};
    use crate::io::{load_bundle, write_dataset};

    fn setup(n: usize) -> (tempfile::TempDir, RunConfig) {
        let tmp = tempfile::tempdir().unwrap();
        let data = simulate(&SimulationConfig {
            n,
            scatter: 0.05,
            frac_censored_y: 0.1,
            ..SimulationConfig::default()
        })
        .unwrap();
        let path = tmp.path().join("data.txt");
        write_dataset(&path, &data).unwrap();

        let mut config = RunConfig::new(path, "e2e");
        config.output_dir = tmp.path().to_path_buf();
        config.nboots = 20;
        (tmp, config)
    }

    #[test]
    fn full_run_persists_reloadable_bundle() {
        let (_tmp, config) = setup(20);
        let out = run_fit(&config).unwrap();

        assert_eq!(out.ensemble.record_count(), 21);
        assert!(out.summary.trials_used >= 2);
        assert!((out.ensemble.original.slope - 2.0).abs() < 0.5);

        let bundle = load_bundle(&out.bundle_path).unwrap();
        assert_eq!(bundle.ensemble, out.ensemble);
        assert_eq!(bundle.config, config);
    }

    #[test]
    fn existing_run_dir_is_rejected_before_fitting() {
        let (_tmp, config) = setup(20);
        std::fs::create_dir_all(config.run_dir()).unwrap();
        assert!(matches!(run_fit(&config), Err(OrthoError::Configuration(_))));
        assert!(!config.run_dir().join("bundle.json").exists());
    }

    #[test]
    fn tiny_dataset_is_a_configuration_error() {
        let (_tmp, config) = setup(3);
        assert!(matches!(run_fit(&config), Err(OrthoError::Configuration(_))));
        assert!(!config.run_dir().exists());
    }
}
