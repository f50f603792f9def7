//! Per-point likelihood for censored orthogonal regression.
//!
//! The line is `y = a + b·x` in log space with intrinsic scatter `s` added in
//! quadrature to the projected measurement errors. Four branches:
//!
//! - both detected: Gaussian in the orthogonal distance `ν`
//! - Y upper limit: survival expression (Pihajoki 2017, eq. B6)
//! - X upper limit: survival expression (Pihajoki 2017, eq. B5)
//! - both limits: no closed form; a constant `1e10` so the reciprocal is negligible
//!
//! Censored branches treat the true value as uniform in *linear* space below
//! `base^limit`. Integrating the line's Gaussian against that prior gives
//!
//! ```text
//! L = k · base^(μ − lim) · exp(k²τ²/2) · ½·erfc((μ + kτ² − lim) / (√2·τ)),   k = ln(base)
//! ```
//!
//! where `μ`/`τ²` are the line's position and spread along the censored axis.
//! The product is evaluated in log space so an underflowing `erfc` never meets
//! an overflowing power term.

use std::f64::consts::{PI, SQRT_2};

use nalgebra::DVector;
use statrs::function::erf::erfc;

use crate::domain::{DataPoint, Dataset, FitParameters};
use crate::models::censoring::Censoring;

/// Logarithmic base of the measured quantities.
pub const LOG_BASE: f64 = 10.0;

/// Floor applied when a censored-branch likelihood underflows to zero.
pub const CENSORED_LIKELIHOOD_FLOOR: f64 = 1e-5;

/// Stand-in likelihood for points censored on both axes.
pub const DOUBLY_CENSORED_LIKELIHOOD: f64 = 1e10;

const VARIANCE_FLOOR: f64 = 1e-12;
const SLOPE_FLOOR: f64 = 1e-12;

/// Counters for the numeric guards hit during one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DegeneracyCounts {
    pub floored_x_censored: usize,
    pub floored_y_censored: usize,
    pub floored_detected: usize,
    pub doubly_censored: usize,
    pub clamped_variance: usize,
}

impl DegeneracyCounts {
    pub fn total(&self) -> usize {
        self.floored_x_censored
            + self.floored_y_censored
            + self.floored_detected
            + self.doubly_censored
            + self.clamped_variance
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LikelihoodModel {
    base: f64,
    rho: f64,
}

impl Default for LikelihoodModel {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl LikelihoodModel {
    pub fn new(rho: f64) -> Self {
        Self::with_base(LOG_BASE, rho)
    }

    pub fn with_base(base: f64, rho: f64) -> Self {
        Self { base, rho }
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Likelihood of a single point under `params`.
    pub fn point_likelihood(&self, point: &DataPoint, params: FitParameters) -> f64 {
        self.evaluate(point, params, &mut DegeneracyCounts::default())
    }

    /// Likelihood of every point, plus the guards that fired.
    pub fn likelihoods(&self, data: &Dataset, params: FitParameters) -> (Vec<f64>, DegeneracyCounts) {
        let mut counts = DegeneracyCounts::default();
        let values = data
            .points()
            .iter()
            .map(|p| self.evaluate(p, params, &mut counts))
            .collect();
        (values, counts)
    }

    /// Objective vector handed to the minimizer: `1 / L_i` per point.
    pub fn residuals(&self, data: &Dataset, params: FitParameters) -> DVector<f64> {
        let mut counts = DegeneracyCounts::default();
        DVector::from_iterator(
            data.len(),
            data.points()
                .iter()
                .map(|p| 1.0 / self.evaluate(p, params, &mut counts)),
        )
    }

    fn evaluate(&self, p: &DataPoint, params: FitParameters, counts: &mut DegeneracyCounts) -> f64 {
        let FitParameters {
            intercept: a,
            slope: b,
            scatter: s,
        } = params;

        match p.censoring() {
            Censoring::BothDetected => {
                let var = self.orthogonal_variance(b, p.sigma_x, p.sigma_y, s, counts);
                let resid = p.y - a - b * p.x;
                let nu2 = resid * resid / (1.0 + b * b);
                let l = (-nu2 / var).exp() / (2.0 * PI * var).sqrt();
                if l > 0.0 && l.is_finite() {
                    l
                } else {
                    counts.floored_detected += 1;
                    f64::MIN_POSITIVE
                }
            }
            Censoring::XDetectedYCensored => {
                let var = self.orthogonal_variance(b, p.sigma_x, p.sigma_y, s, counts);
                let mu = a + b * p.x;
                let tau2 = floor_variance((1.0 + b * b) * var / 2.0, counts);
                let l = self.upper_limit_likelihood(mu, tau2, p.y);
                if l > 0.0 && l.is_finite() {
                    l
                } else {
                    counts.floored_y_censored += 1;
                    CENSORED_LIKELIHOOD_FLOOR
                }
            }
            Censoring::YDetectedXCensored => {
                let var = self.orthogonal_variance(b, p.sigma_x, p.sigma_y, s, counts);
                let b = guard_slope(b);
                let mu = (p.y - a) / b;
                let tau2 = floor_variance((1.0 + b * b) * var / (2.0 * b * b), counts);
                let l = self.upper_limit_likelihood(mu, tau2, p.x);
                if l > 0.0 && l.is_finite() {
                    l
                } else {
                    counts.floored_x_censored += 1;
                    CENSORED_LIKELIHOOD_FLOOR
                }
            }
            Censoring::BothCensored => {
                counts.doubly_censored += 1;
                DOUBLY_CENSORED_LIKELIHOOD
            }
        }
    }

    /// Effective variance perpendicular to the line, intrinsic scatter included.
    fn orthogonal_variance(
        &self,
        b: f64,
        sigma_x: f64,
        sigma_y: f64,
        s: f64,
        counts: &mut DegeneracyCounts,
    ) -> f64 {
        let b2 = b * b;
        let projected =
            (b2 * sigma_x * sigma_x + sigma_y * sigma_y - 2.0 * b * self.rho * sigma_x * sigma_y) / (1.0 + b2);
        floor_variance(projected + s * s, counts)
    }

    /// Probability density for an upper limit at `limit` given the line sits at `mu` with spread `tau2`.
    fn upper_limit_likelihood(&self, mu: f64, tau2: f64, limit: f64) -> f64 {
        let k = self.base.ln();
        let tau = tau2.sqrt();
        let z = (mu + k * tau2 - limit) / (SQRT_2 * tau);
        let tail = 0.5 * erfc(z);
        if !(tail > 0.0) {
            return 0.0;
        }
        let ln_l = k.ln() + k * (mu - limit) + 0.5 * k * k * tau2 + tail.ln();
        ln_l.exp()
    }
}

fn floor_variance(var: f64, counts: &mut DegeneracyCounts) -> f64 {
    if var > VARIANCE_FLOOR {
        var
    } else {
        counts.clamped_variance += 1;
        VARIANCE_FLOOR
    }
}

fn guard_slope(b: f64) -> f64 {
    if b.abs() >= SLOPE_FLOOR {
        b
    } else if b.is_sign_negative() {
        -SLOPE_FLOOR
    } else {
        SLOPE_FLOOR
    }
}
