//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - persisted into the result bundle
//! - reloaded later to reprint summaries or replay individual trials

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::OrthoError;

/// Number of free parameters in the line model (intercept, slope, scatter).
pub const PARAM_COUNT: usize = 3;

/// Bootstrap counts above this are rejected unless explicitly allowed.
pub const MAX_NBOOTS: usize = 10_000;

/// Bootstrap counts above this only trigger a warning.
pub const WARN_NBOOTS: usize = 1_000;

pub const DEFAULT_NBOOTS: usize = 1_000;
pub const DEFAULT_SEED: u64 = 42;

/// One observation in log space.
///
/// A censored axis means the value is an upper limit rather than a detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: f64,
    pub sigma_x: f64,
    pub censored_x: bool,
    pub y: f64,
    pub sigma_y: f64,
    pub censored_y: bool,
}

impl DataPoint {
    pub fn detected(x: f64, sigma_x: f64, y: f64, sigma_y: f64) -> Self {
        Self {
            x,
            sigma_x,
            censored_x: false,
            y,
            sigma_y,
            censored_y: false,
        }
    }
}

/// Ordered, immutable collection of points.
///
/// Bootstrap draws never mutate a dataset; they build a new one from row indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    points: Vec<DataPoint>,
}

impl Dataset {
    pub fn new(points: Vec<DataPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn get(&self, idx: usize) -> Option<&DataPoint> {
        self.points.get(idx)
    }

    /// Build the dataset selected by `indices` (repeats allowed).
    ///
    /// # Panics
    /// Panics if any index is out of bounds. Index rows come from the resampler,
    /// which only draws from `0..len`.
    pub fn resample(&self, indices: &[usize]) -> Dataset {
        Dataset {
            points: indices.iter().map(|&i| self.points[i]).collect(),
        }
    }

    pub fn degrees_of_freedom(&self) -> Option<usize> {
        self.len().checked_sub(PARAM_COUNT).filter(|&dof| dof > 0)
    }
}

/// Trial parameters handed to the likelihood.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParameters {
    pub intercept: f64,
    pub slope: f64,
    pub scatter: f64,
}

impl FitParameters {
    pub const fn new(intercept: f64, slope: f64, scatter: f64) -> Self {
        Self {
            intercept,
            slope,
            scatter,
        }
    }

    /// Conventional starting point for every fit.
    pub const INITIAL: FitParameters = FitParameters::new(1.0, 1.0, 1.0);

    pub fn to_array(self) -> [f64; PARAM_COUNT] {
        [self.intercept, self.slope, self.scatter]
    }

    pub fn from_array(p: [f64; PARAM_COUNT]) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

/// Canonical record for a single converged fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub slope: f64,
    pub slope_unc: f64,
    pub intercept: f64,
    pub intercept_unc: f64,
    /// Always reported non-negative; only its square enters the model.
    pub scatter: f64,
    pub scatter_unc: f64,
    pub reduced_chi2: f64,
    pub iterations: usize,
}

impl FitResult {
    pub fn params(&self) -> FitParameters {
        FitParameters::new(self.intercept, self.slope, self.scatter)
    }

    pub fn value(&self, param: Parameter) -> f64 {
        match param {
            Parameter::Slope => self.slope,
            Parameter::Intercept => self.intercept,
            Parameter::Scatter => self.scatter,
        }
    }

    pub fn uncertainty(&self, param: Parameter) -> f64 {
        match param {
            Parameter::Slope => self.slope_unc,
            Parameter::Intercept => self.intercept_unc,
            Parameter::Scatter => self.scatter_unc,
        }
    }

    /// Evaluate the fitted line at `x`.
    pub fn line_at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// The three reported quantities, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    Slope,
    Intercept,
    Scatter,
}

impl Parameter {
    pub const ALL: [Parameter; 3] = [Parameter::Slope, Parameter::Intercept, Parameter::Scatter];

    pub fn display_name(self) -> &'static str {
        match self {
            Parameter::Slope => "slope",
            Parameter::Intercept => "intercept",
            Parameter::Scatter => "scatter",
        }
    }
}

/// Outcome of one bootstrap trial.
///
/// Failed trials keep their slot so the index matrix stays aligned with the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// 1-based trial number (trial 0 is the original fit).
    pub trial: usize,
    pub fit: Option<FitResult>,
    pub failure: Option<String>,
}

impl TrialRecord {
    pub fn converged(trial: usize, fit: FitResult) -> Self {
        Self {
            trial,
            fit: Some(fit),
            failure: None,
        }
    }

    pub fn failed(trial: usize, message: impl Into<String>) -> Self {
        Self {
            trial,
            fit: None,
            failure: Some(message.into()),
        }
    }
}

/// Row-major `nboots × n` matrix of bootstrap row selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMatrix {
    rows: usize,
    cols: usize,
    data: Vec<usize>,
}

impl IndexMatrix {
    pub fn from_rows(rows: usize, cols: usize, data: Vec<usize>) -> Result<Self, OrthoError> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(OrthoError::Serialization(format!(
                "index matrix shape {rows}x{cols} does not match {} entries",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[usize] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[usize]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.data
    }
}

/// Everything produced by one bootstrap run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapEnsemble {
    pub original: FitResult,
    pub trials: Vec<TrialRecord>,
    pub indices: IndexMatrix,
}

impl BootstrapEnsemble {
    pub fn nboots(&self) -> usize {
        self.trials.len()
    }

    /// Total records including the original fit.
    pub fn record_count(&self) -> usize {
        self.trials.len() + 1
    }

    pub fn converged_fits(&self) -> impl Iterator<Item = &FitResult> + '_ {
        self.trials.iter().filter_map(|t| t.fit.as_ref())
    }

    pub fn failed_count(&self) -> usize {
        self.trials.iter().filter(|t| t.fit.is_none()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    pub parameter: Parameter,
    pub original_value: f64,
    pub median_across_trials: f64,
    pub stdev_across_trials: f64,
    pub median_reported_uncertainty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub slope: ParameterSummary,
    pub intercept: ParameterSummary,
    pub scatter: ParameterSummary,
    pub trials_used: usize,
    pub trials_failed: usize,
}

impl SummaryStats {
    pub fn get(&self, param: Parameter) -> &ParameterSummary {
        match param {
            Parameter::Slope => &self.slope,
            Parameter::Intercept => &self.intercept,
            Parameter::Scatter => &self.scatter,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterSummary> + '_ {
        Parameter::ALL.into_iter().map(|p| self.get(p))
    }
}

/// Resolved run configuration.
///
/// This is derived from CLI flags (plus defaults) and stored verbatim in the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub dataset_path: PathBuf,
    pub nboots: usize,
    pub run_name: String,
    pub output_dir: PathBuf,
    pub overwrite: bool,
    pub rho: f64,
    pub plot: bool,
    pub verbose: bool,
    pub seed: u64,
    /// Which `value sigma flag` triple is X (multi-quantity files).
    pub x_column: usize,
    /// Which `value sigma flag` triple is Y (multi-quantity files).
    pub y_column: usize,
    pub allow_large_nboots: bool,
    pub parallel: bool,
}

impl RunConfig {
    pub fn new(dataset_path: impl Into<PathBuf>, run_name: impl Into<String>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            nboots: DEFAULT_NBOOTS,
            run_name: run_name.into(),
            output_dir: PathBuf::from("."),
            overwrite: false,
            rho: 0.0,
            plot: false,
            verbose: false,
            seed: DEFAULT_SEED,
            x_column: 0,
            y_column: 1,
            allow_large_nboots: false,
            parallel: true,
        }
    }

    pub fn run_dir(&self) -> PathBuf {
        self.output_dir.join(&self.run_name)
    }

    /// Check every parameter that can be checked without touching the disk.
    pub fn validate(&self) -> Result<(), OrthoError> {
        if self.nboots < 2 {
            return Err(OrthoError::config(format!(
                "nboots={} is too small; dispersion statistics need at least 2 bootstrap trials",
                self.nboots
            )));
        }
        if self.nboots > MAX_NBOOTS && !self.allow_large_nboots {
            return Err(OrthoError::config(format!(
                "nboots={} exceeds {MAX_NBOOTS}; pass --allow-large-nboots to run it anyway",
                self.nboots
            )));
        }
        if self.nboots > WARN_NBOOTS {
            tracing::warn!(nboots = self.nboots, "large bootstrap count, this may take a while");
        }

        if !(self.rho.is_finite() && (-1.0..=1.0).contains(&self.rho)) {
            return Err(OrthoError::config(format!(
                "rho={} must be a correlation in [-1, 1]",
                self.rho
            )));
        }
        if self.rho != 0.0 {
            tracing::warn!(rho = self.rho, "nonzero error correlation is supported but unverified");
        }

        if self.run_name.trim().is_empty() {
            return Err(OrthoError::config("run name must not be empty"));
        }
        if self.run_name.contains(['/', '\\']) || self.run_name == "." || self.run_name == ".." {
            return Err(OrthoError::config(format!(
                "run name '{}' must be a single directory name",
                self.run_name
            )));
        }
        if self.x_column == self.y_column {
            return Err(OrthoError::config("x and y columns must differ"));
        }

        Ok(())
    }
}
