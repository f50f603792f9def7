//! Bootstrap orchestration.
//!
//! Trial 0 fits the untouched dataset; trials 1..=nboots each fit the rows
//! selected by one row of the index matrix. Trials share nothing but the
//! read-only dataset, so they run on the rayon pool and are gathered with an
//! ordered `collect` (each trial owns exactly one output slot).
//!
//! A bootstrap trial that fails to converge is recorded and logged, not fatal.
//! Trial 0 failing is fatal: without a baseline there is nothing to report.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{BootstrapEnsemble, Dataset, IndexMatrix, TrialRecord};
use crate::error::OrthoError;
use crate::fit::driver::FitDriver;
use crate::math::Minimizer;

#[derive(Debug, Clone)]
pub struct BootstrapOrchestrator<M> {
    driver: FitDriver<M>,
    parallel: bool,
}

impl<M: Minimizer> BootstrapOrchestrator<M> {
    pub fn new(driver: FitDriver<M>) -> Self {
        Self { driver, parallel: true }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn driver(&self) -> &FitDriver<M> {
        &self.driver
    }

    /// Fit the original dataset plus one resampled dataset per index row.
    pub fn run(&self, data: &Dataset, indices: IndexMatrix) -> Result<BootstrapEnsemble, OrthoError> {
        check_indices(data, &indices)?;

        let original = self.driver.fit(data, 0)?;
        info!(
            slope = original.slope,
            intercept = original.intercept,
            scatter = original.scatter,
            "original fit converged"
        );

        let nboots = indices.rows();
        let fit_trial = |i: usize| -> TrialRecord {
            let trial = i + 1;
            let sample = data.resample(indices.row(i));
            match self.driver.fit(&sample, trial) {
                Ok(fit) => {
                    debug!(trial, slope = fit.slope, intercept = fit.intercept, "bootstrap trial converged");
                    TrialRecord::converged(trial, fit)
                }
                Err(err) => {
                    warn!(trial, error = %err, "bootstrap trial failed");
                    TrialRecord::failed(trial, err.to_string())
                }
            }
        };

        let trials: Vec<TrialRecord> = if self.parallel {
            (0..nboots).into_par_iter().map(fit_trial).collect()
        } else {
            (0..nboots).map(fit_trial).collect()
        };

        let ensemble = BootstrapEnsemble {
            original,
            trials,
            indices,
        };
        info!(
            nboots,
            failed = ensemble.failed_count(),
            "bootstrap ensemble complete"
        );
        Ok(ensemble)
    }
}

fn check_indices(data: &Dataset, indices: &IndexMatrix) -> Result<(), OrthoError> {
    if indices.rows() == 0 {
        return Ok(());
    }
    if indices.cols() != data.len() {
        return Err(OrthoError::config(format!(
            "index matrix has {} columns but the dataset has {} rows",
            indices.cols(),
            data.len()
        )));
    }
    if let Some(&bad) = indices.as_slice().iter().find(|&&i| i >= data.len()) {
        return Err(OrthoError::config(format!(
            "index {bad} out of range for a dataset of {} rows",
            data.len()
        )));
    }
    Ok(())
}
