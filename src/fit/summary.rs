//! Reduce a bootstrap ensemble to per-parameter summary statistics.
//!
//! For each of slope / intercept / scatter:
//! - the original (trial 0) value
//! - median and sample standard deviation over converged bootstrap trials
//! - median of the per-trial reported standard errors
//!
//! Trial 0 never enters the dispersion statistics.

use crate::domain::{BootstrapEnsemble, FitResult, Parameter, ParameterSummary, SummaryStats};
use crate::error::OrthoError;
use crate::math::{median, sample_std};

pub fn summarize(ensemble: &BootstrapEnsemble) -> Result<SummaryStats, OrthoError> {
    let nboots = ensemble.nboots();
    if nboots < 2 {
        return Err(OrthoError::config(format!(
            "nboots={nboots}: the standard deviation needs at least 2 bootstrap trials"
        )));
    }

    let fits: Vec<&FitResult> = ensemble.converged_fits().collect();
    if fits.len() < 2 {
        return Err(OrthoError::InsufficientTrials { valid: fits.len() });
    }

    let summarize_param = |param: Parameter| -> Result<ParameterSummary, OrthoError> {
        let values: Vec<f64> = fits.iter().map(|f| f.value(param)).collect();
        let uncs: Vec<f64> = fits.iter().map(|f| f.uncertainty(param)).collect();
        let insufficient = || OrthoError::InsufficientTrials { valid: fits.len() };

        Ok(ParameterSummary {
            parameter: param,
            original_value: ensemble.original.value(param),
            median_across_trials: median(&values).ok_or_else(insufficient)?,
            stdev_across_trials: sample_std(&values).ok_or_else(insufficient)?,
            median_reported_uncertainty: median(&uncs).ok_or_else(insufficient)?,
        })
    };

    Ok(SummaryStats {
        slope: summarize_param(Parameter::Slope)?,
        intercept: summarize_param(Parameter::Intercept)?,
        scatter: summarize_param(Parameter::Scatter)?,
        trials_used: fits.len(),
        trials_failed: ensemble.failed_count(),
    })
}
