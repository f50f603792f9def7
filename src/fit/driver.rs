//! One minimization run over one dataset.
//!
//! Given:
//! - a dataset (original or resampled)
//! - the likelihood model
//! - a minimizer
//!
//! we minimize the reciprocal-likelihood vector from `(1, 1, 1)` and turn the
//! solver output into a `FitResult`:
//! - reduced χ² = objective at the minimum / (n − 3)
//! - standard errors = sqrt(diag((JᵀJ)⁺) · reduced χ²)

use tracing::debug;

use crate::domain::{Dataset, FitParameters, FitResult, PARAM_COUNT};
use crate::error::OrthoError;
use crate::math::{LevenbergMarquardt, Minimizer};
use crate::models::LikelihoodModel;

#[derive(Debug, Clone)]
pub struct FitDriver<M = LevenbergMarquardt> {
    model: LikelihoodModel,
    minimizer: M,
    initial: FitParameters,
}

impl FitDriver<LevenbergMarquardt> {
    pub fn new(model: LikelihoodModel) -> Self {
        Self::with_minimizer(model, LevenbergMarquardt::default())
    }
}

impl<M: Minimizer> FitDriver<M> {
    pub fn with_minimizer(model: LikelihoodModel, minimizer: M) -> Self {
        Self {
            model,
            minimizer,
            initial: FitParameters::INITIAL,
        }
    }

    pub fn with_initial(mut self, initial: FitParameters) -> Self {
        self.initial = initial;
        self
    }

    pub fn model(&self) -> &LikelihoodModel {
        &self.model
    }

    /// Fit `data`; `trial` only labels errors and log lines.
    pub fn fit(&self, data: &Dataset, trial: usize) -> Result<FitResult, OrthoError> {
        let n = data.len();
        let Some(dof) = data.degrees_of_freedom() else {
            return Err(OrthoError::InsufficientData { n });
        };

        let objective = |p: &[f64]| self.model.residuals(data, FitParameters::new(p[0], p[1], p[2]));
        let out = self.minimizer.minimize(&objective, &self.initial.to_array());

        if !out.converged {
            return Err(OrthoError::ConvergenceFailure {
                trial,
                message: out.message,
            });
        }
        if out.params.len() != PARAM_COUNT || out.params.iter().any(|v| !v.is_finite()) {
            return Err(OrthoError::ConvergenceFailure {
                trial,
                message: format!("minimizer returned invalid parameters {:?}", out.params),
            });
        }
        let Some(cov) = out.covariance else {
            return Err(OrthoError::ConvergenceFailure {
                trial,
                message: "parameter covariance unavailable".to_string(),
            });
        };

        let reduced_chi2 = out.objective / dof as f64;
        let stderr = |i: usize| (cov[(i, i)] * reduced_chi2).max(0.0).sqrt();
        let params = FitParameters::new(out.params[0], out.params[1], out.params[2]);

        let (_, counts) = self.model.likelihoods(data, params);
        if counts.total() > 0 {
            debug!(
                trial,
                floored_x = counts.floored_x_censored,
                floored_y = counts.floored_y_censored,
                floored_detected = counts.floored_detected,
                doubly_censored = counts.doubly_censored,
                clamped_variance = counts.clamped_variance,
                "numeric guards active at best fit"
            );
        }

        Ok(FitResult {
            slope: params.slope,
            slope_unc: stderr(1),
            intercept: params.intercept,
            intercept_unc: stderr(0),
            scatter: params.scatter.abs(),
            scatter_unc: stderr(2),
            reduced_chi2,
            iterations: out.iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{DMatrix, DVector};

    use super::*;
    use crate::domain::DataPoint;
    use crate::math::{Minimization, Objective};

    fn line_data() -> Dataset {
        // y = 1 + 2x with a deterministic zig-zag so the fit is not exact.
        let points = (0..12)
            .map(|i| {
                let x = 0.5 + 0.2 * i as f64;
                let wiggle = if i % 2 == 0 { 0.15 } else { -0.15 };
                DataPoint::detected(x, 0.05, 1.0 + 2.0 * x + wiggle, 0.05)
            })
            .collect();
        Dataset::new(points)
    }

    struct FixedMinimizer {
        params: Vec<f64>,
        converged: bool,
    }

    impl Minimizer for FixedMinimizer {
        fn minimize(&self, objective: &Objective<'_>, _initial: &[f64]) -> Minimization {
            let r = objective(&self.params);
            Minimization {
                params: self.params.clone(),
                covariance: Some(DMatrix::identity(3, 3)),
                objective: r.norm_squared(),
                n_residuals: r.len(),
                iterations: 1,
                converged: self.converged,
                message: "fixed".to_string(),
            }
        }
    }

    #[test]
    fn recovers_clean_line() {
        let driver = FitDriver::new(LikelihoodModel::default());
        let fit = driver.fit(&line_data(), 0).unwrap();

        assert!((fit.slope - 2.0).abs() < 0.1, "slope={}", fit.slope);
        assert!((fit.intercept - 1.0).abs() < 0.2, "intercept={}", fit.intercept);
        assert!(fit.scatter >= 0.0);
        assert!(fit.reduced_chi2.is_finite());
        assert!(fit.slope_unc.is_finite() && fit.intercept_unc.is_finite() && fit.scatter_unc.is_finite());
    }

    #[test]
    fn converges_when_data_sit_far_from_the_initial_guess() {
        let data = crate::data::simulate(&crate::data::SimulationConfig {
            n: 30,
            x_min: 5.0,
            x_max: 8.0,
            ..crate::data::SimulationConfig::default()
        })
        .unwrap();
        let driver = FitDriver::new(LikelihoodModel::default());
        let fit = driver.fit(&data, 0).unwrap();

        assert!((fit.slope - 2.0).abs() < 0.05, "slope={}", fit.slope);
        assert!((fit.intercept - 1.0).abs() < 0.3, "intercept={}", fit.intercept);
        assert!(fit.iterations < LevenbergMarquardt::default().max_iterations);
    }

    #[test]
    fn rejects_three_points() {
        let data = Dataset::new(line_data().points()[..3].to_vec());
        let err = FitDriver::new(LikelihoodModel::default()).fit(&data, 0).unwrap_err();
        assert!(matches!(err, OrthoError::InsufficientData { n: 3 }));
    }

    #[test]
    fn surfaces_convergence_failure() {
        let driver = FitDriver::with_minimizer(
            LikelihoodModel::default(),
            FixedMinimizer {
                params: vec![1.0, 2.0, 0.1],
                converged: false,
            },
        );
        let err = driver.fit(&line_data(), 17).unwrap_err();
        assert!(matches!(err, OrthoError::ConvergenceFailure { trial: 17, .. }));
    }

    #[test]
    fn folds_negative_scatter_and_scales_errors() {
        let data = line_data();
        let driver = FitDriver::with_minimizer(
            LikelihoodModel::default(),
            FixedMinimizer {
                params: vec![1.0, 2.0, -0.1],
                converged: true,
            },
        );
        let fit = driver.fit(&data, 0).unwrap();
        assert_eq!(fit.scatter, 0.1);

        let r: DVector<f64> = LikelihoodModel::default().residuals(&data, FitParameters::new(1.0, 2.0, -0.1));
        let chi2 = r.norm_squared() / (data.len() - 3) as f64;
        assert!((fit.reduced_chi2 - chi2).abs() < 1e-12);
        assert!((fit.slope_unc - chi2.sqrt()).abs() < 1e-12);
    }
}
