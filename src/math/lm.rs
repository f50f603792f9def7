//! Levenberg–Marquardt nonlinear least squares.
//!
//! The fitting code only talks to the [`Minimizer`] trait:
//!
//! ```text
//! minimize(objective, initial) -> { params, covariance, objective, n_residuals, iterations, converged }
//! ```
//!
//! so any solver honoring that contract can be swapped in. The bundled
//! implementation is a textbook LM loop:
//!
//! - forward-difference Jacobian (backward difference if the forward step is non-finite)
//! - Marquardt damping `(JᵀJ + λ·diag(JᵀJ)) δ = −Jᵀr`, solved by Cholesky
//! - `λ` shrinks ×10 on accepted steps and grows ×10 on rejected ones
//! - trial points with a non-finite cost are rejected like any uphill step
//!
//! The returned covariance is the unscaled `(JᵀJ)⁺` at the optimum, computed via
//! SVD so rank-deficient problems still yield a usable (pseudo-)inverse.

use nalgebra::{DMatrix, DVector};

/// Residual function: parameters in, residual vector out.
pub type Objective<'a> = dyn Fn(&[f64]) -> DVector<f64> + 'a;

/// Result of one minimization.
#[derive(Debug, Clone)]
pub struct Minimization {
    pub params: Vec<f64>,
    /// Unscaled covariance `(JᵀJ)⁺`; `None` if it could not be formed.
    pub covariance: Option<DMatrix<f64>>,
    /// Sum of squared residuals at `params`.
    pub objective: f64,
    pub n_residuals: usize,
    pub iterations: usize,
    pub converged: bool,
    pub message: String,
}

impl Minimization {
    pub fn degrees_of_freedom(&self) -> usize {
        self.n_residuals.saturating_sub(self.params.len())
    }
}

pub trait Minimizer: Sync {
    fn minimize(&self, objective: &Objective<'_>, initial: &[f64]) -> Minimization;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevenbergMarquardt {
    pub max_iterations: usize,
    /// Relative cost reduction below which an accepted step counts as converged.
    pub ftol: f64,
    /// Relative step size below which an accepted step counts as converged.
    pub xtol: f64,
    /// Absolute gradient (∞-norm) below which the current point counts as converged.
    pub gtol: f64,
    pub initial_lambda: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: MINPACK_TOL,
            xtol: MINPACK_TOL,
            gtol: 1e-12,
            initial_lambda: 1e-3,
        }
    }
}

/// `sqrt(f64::EPSILON)`, the MINPACK `lmdif` default for `ftol` and `xtol`.
pub const MINPACK_TOL: f64 = 1.49012e-8;

const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e16;
const PINV_EPS: f64 = 1e-14;

impl Minimizer for LevenbergMarquardt {
    fn minimize(&self, objective: &Objective<'_>, initial: &[f64]) -> Minimization {
        let n_params = initial.len();
        let mut p = DVector::from_column_slice(initial);
        let mut r = objective(p.as_slice());
        let mut cost = r.norm_squared();

        let fail = |p: &DVector<f64>, cost: f64, n_residuals: usize, iterations: usize, message: String| Minimization {
            params: p.as_slice().to_vec(),
            covariance: None,
            objective: cost,
            n_residuals,
            iterations,
            converged: false,
            message,
        };

        if r.len() < n_params {
            return fail(
                &p,
                cost,
                r.len(),
                0,
                format!("{} residuals cannot constrain {n_params} parameters", r.len()),
            );
        }
        if !cost.is_finite() {
            return fail(&p, cost, r.len(), 0, "objective is not finite at the initial parameters".to_string());
        }

        let mut lambda = self.initial_lambda;
        let mut jac = jacobian(objective, &p, &r);
        let mut converged = false;
        let mut message = String::new();
        let mut iterations = 0;

        'outer: while iterations < self.max_iterations {
            iterations += 1;

            if cost == 0.0 {
                converged = true;
                message = "objective is exactly zero".to_string();
                break;
            }

            let jt = jac.transpose();
            let jtj = &jt * &jac;
            let grad = &jt * &r;
            if grad.amax() <= self.gtol {
                converged = true;
                message = "gradient below tolerance".to_string();
                break;
            }
            let neg_grad = -grad;

            loop {
                let mut damped = jtj.clone();
                for i in 0..n_params {
                    let d = jtj[(i, i)];
                    damped[(i, i)] += lambda * if d > 0.0 { d } else { 1.0 };
                }

                let Some(chol) = damped.cholesky() else {
                    lambda *= 10.0;
                    if lambda > LAMBDA_MAX {
                        converged = true;
                        message = "damped normal equations stayed singular; no further reduction possible".to_string();
                        break 'outer;
                    }
                    continue;
                };
                let step = chol.solve(&neg_grad);
                let p_new = &p + &step;
                let r_new = objective(p_new.as_slice());
                let cost_new = r_new.norm_squared();

                if cost_new.is_finite() && cost_new < cost {
                    let reduction = (cost - cost_new) / cost;
                    let step_rel = step.norm() / (p.norm() + self.xtol);

                    p = p_new;
                    r = r_new;
                    cost = cost_new;
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);

                    if reduction <= self.ftol {
                        converged = true;
                        message = "relative reduction in cost below tolerance".to_string();
                        break 'outer;
                    }
                    if step_rel <= self.xtol {
                        converged = true;
                        message = "relative step size below tolerance".to_string();
                        break 'outer;
                    }
                    break;
                }

                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    converged = true;
                    message = "no further reduction possible".to_string();
                    break 'outer;
                }
            }

            jac = jacobian(objective, &p, &r);
        }

        if !converged {
            return fail(
                &p,
                cost,
                r.len(),
                iterations,
                format!("no convergence after {iterations} iterations"),
            );
        }

        let jac = jacobian(objective, &p, &r);
        let jtj = jac.transpose() * &jac;
        let covariance = jtj.pseudo_inverse(PINV_EPS).ok();

        Minimization {
            params: p.as_slice().to_vec(),
            covariance,
            objective: cost,
            n_residuals: r.len(),
            iterations,
            converged,
            message,
        }
    }
}

/// Finite-difference Jacobian of `objective` at `p`, given `r = objective(p)`.
fn jacobian(objective: &Objective<'_>, p: &DVector<f64>, r: &DVector<f64>) -> DMatrix<f64> {
    let m = r.len();
    let n = p.len();
    let mut jac = DMatrix::zeros(m, n);
    let sqrt_eps = f64::EPSILON.sqrt();

    for j in 0..n {
        let h = sqrt_eps * p[j].abs().max(1.0);

        let mut shifted = p.clone();
        shifted[j] += h;
        let forward = objective(shifted.as_slice());
        if forward.len() == m && forward.iter().all(|v| v.is_finite()) {
            jac.set_column(j, &((forward - r) / h));
            continue;
        }

        shifted[j] = p[j] - h;
        let backward = objective(shifted.as_slice());
        if backward.len() == m && backward.iter().all(|v| v.is_finite()) {
            jac.set_column(j, &((r - backward) / h));
        }
        // Otherwise the column stays zero: the parameter is locally unidentifiable.
    }

    jac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_linear_residuals_exactly() {
        let objective = |p: &[f64]| DVector::from_vec(vec![p[0] - 3.0, 2.0 * (p[1] + 1.0), p[2] - 0.5]);
        let out = LevenbergMarquardt::default().minimize(&objective, &[0.0, 0.0, 0.0]);

        assert!(out.converged, "{}", out.message);
        assert!((out.params[0] - 3.0).abs() < 1e-6);
        assert!((out.params[1] + 1.0).abs() < 1e-6);
        assert!((out.params[2] - 0.5).abs() < 1e-6);
        assert!(out.objective < 1e-12);
    }

    #[test]
    fn solves_rosenbrock() {
        let objective = |p: &[f64]| DVector::from_vec(vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]]);
        let out = LevenbergMarquardt::default().minimize(&objective, &[-1.2, 1.0]);

        assert!(out.converged, "{}", out.message);
        assert!((out.params[0] - 1.0).abs() < 1e-5, "x={}", out.params[0]);
        assert!((out.params[1] - 1.0).abs() < 1e-5, "y={}", out.params[1]);
    }

    #[test]
    fn reports_failure_when_iterations_run_out() {
        let objective = |p: &[f64]| DVector::from_vec(vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]]);
        let lm = LevenbergMarquardt {
            max_iterations: 1,
            ..LevenbergMarquardt::default()
        };
        let out = lm.minimize(&objective, &[-1.2, 1.0]);
        assert!(!out.converged);
        assert!(out.covariance.is_none());
    }

    #[test]
    fn covariance_matches_linear_regression() {
        // r_i = a + b·x_i − y_i  ⇒  JᵀJ = XᵀX.
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.1, 2.9, 5.2, 6.8];
        let objective = |p: &[f64]| DVector::from_iterator(4, xs.iter().zip(ys.iter()).map(|(x, y)| p[0] + p[1] * x - y));
        let out = LevenbergMarquardt::default().minimize(&objective, &[0.0, 0.0]);
        assert!(out.converged, "{}", out.message);
        assert_eq!(out.degrees_of_freedom(), 2);

        let cov = out.covariance.unwrap();
        // (XᵀX)⁻¹ for x = 0..3: [[0.7, -0.3], [-0.3, 0.2]].
        assert!((cov[(0, 0)] - 0.7).abs() < 1e-4);
        assert!((cov[(0, 1)] + 0.3).abs() < 1e-4);
        assert!((cov[(1, 1)] - 0.2).abs() < 1e-4);
    }

    #[test]
    fn rejects_underdetermined_problems() {
        let objective = |p: &[f64]| DVector::from_vec(vec![p[0] + p[1]]);
        let out = LevenbergMarquardt::default().minimize(&objective, &[0.0, 0.0]);
        assert!(!out.converged);
    }
}
