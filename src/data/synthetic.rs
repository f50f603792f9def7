//! Synthetic censored datasets drawn from a known line.
//!
//! Used by `ortho simulate` and by tests that need data with a known answer.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{DataPoint, Dataset};
use crate::error::OrthoError;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub n: usize,
    pub intercept: f64,
    pub slope: f64,
    /// Intrinsic scatter, applied perpendicular to the y axis.
    pub scatter: f64,
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub x_min: f64,
    pub x_max: f64,
    /// Probability a point becomes a Y upper limit.
    pub frac_censored_y: f64,
    /// Probability a point becomes an X upper limit.
    pub frac_censored_x: f64,
    /// Probability a point becomes an upper limit on both axes.
    pub frac_censored_both: f64,
    /// How far above the observed value an upper limit is placed (log units).
    pub limit_offset: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n: 20,
            intercept: 1.0,
            slope: 2.0,
            scatter: 0.0,
            sigma_x: 0.05,
            sigma_y: 0.05,
            x_min: 0.0,
            x_max: 3.0,
            frac_censored_y: 0.0,
            frac_censored_x: 0.0,
            frac_censored_both: 0.0,
            limit_offset: 0.3,
            seed: 42,
        }
    }
}

pub fn simulate(config: &SimulationConfig) -> Result<Dataset, OrthoError> {
    if config.n == 0 {
        return Err(OrthoError::config("simulated sample size must be > 0"));
    }
    if !(config.x_min.is_finite() && config.x_max.is_finite() && config.x_max > config.x_min) {
        return Err(OrthoError::config("invalid x range for simulation"));
    }
    let fracs = [config.frac_censored_y, config.frac_censored_x, config.frac_censored_both];
    if fracs.iter().any(|f| !(0.0..=1.0).contains(f)) || fracs.iter().sum::<f64>() > 1.0 {
        return Err(OrthoError::config("censoring fractions must be in [0, 1] and sum to at most 1"));
    }

    let normal = |sd: f64| {
        Normal::new(0.0, sd).map_err(|e| OrthoError::config(format!("invalid noise level {sd}: {e}")))
    };
    let scatter = normal(config.scatter)?;
    let noise_x = normal(config.sigma_x)?;
    let noise_y = normal(config.sigma_y)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut points = Vec::with_capacity(config.n);

    for _ in 0..config.n {
        let x_true = rng.gen_range(config.x_min..=config.x_max);
        let y_true = config.intercept + config.slope * x_true + scatter.sample(&mut rng);

        let mut point = DataPoint::detected(
            x_true + noise_x.sample(&mut rng),
            config.sigma_x,
            y_true + noise_y.sample(&mut rng),
            config.sigma_y,
        );

        let roll: f64 = rng.r#gen();
        if roll < config.frac_censored_y {
            point.censored_y = true;
        } else if roll < config.frac_censored_y + config.frac_censored_x {
            point.censored_x = true;
        } else if roll < fracs.iter().sum::<f64>() {
            point.censored_x = true;
            point.censored_y = true;
        }
        if point.censored_x {
            point.x += config.limit_offset;
        }
        if point.censored_y {
            point.y += config.limit_offset;
        }

        points.push(point);
    }

    Ok(Dataset::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Censoring, censoring_counts};

    #[test]
    fn same_seed_same_dataset() {
        let config = SimulationConfig::default();
        assert_eq!(simulate(&config).unwrap(), simulate(&config).unwrap());
    }

    #[test]
    fn clean_data_hugs_the_line() {
        let data = simulate(&SimulationConfig {
            n: 200,
            ..SimulationConfig::default()
        })
        .unwrap();
        for p in data.points() {
            assert_eq!(p.censoring(), Censoring::BothDetected);
            // 0.05 noise on both axes, slope 2: |resid| beyond 0.6 is ~5σ.
            assert!((p.y - 1.0 - 2.0 * p.x).abs() < 0.6);
        }
    }

    #[test]
    fn censoring_fractions_are_respected() {
        let data = simulate(&SimulationConfig {
            n: 2000,
            frac_censored_y: 0.2,
            frac_censored_x: 0.1,
            frac_censored_both: 0.05,
            ..SimulationConfig::default()
        })
        .unwrap();
        let counts = censoring_counts(data.points());
        let frac = |c: usize| c as f64 / 2000.0;
        assert!((frac(counts[1]) - 0.2).abs() < 0.04);
        assert!((frac(counts[2]) - 0.1).abs() < 0.03);
        assert!((frac(counts[3]) - 0.05).abs() < 0.02);
    }

    #[test]
    fn rejects_bad_fractions() {
        let config = SimulationConfig {
            frac_censored_y: 0.8,
            frac_censored_x: 0.5,
            ..SimulationConfig::default()
        };
        assert!(simulate(&config).is_err());
    }
}
