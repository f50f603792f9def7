//! Result bundle persistence.
//!
//! A run directory holds:
//! - `bundle.json`: config, dataset, every trial record, the index matrix and the summary
//! - `fits.csv`: one row per trial, trial 0 being the original fit
//! - `indices.csv`: the bootstrap index matrix, one row per trial, no header
//! - `summary.csv`: one row per parameter
//!
//! Only `bundle.json` is read back; the CSV tables are for spreadsheets and
//! downstream scripts.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{BootstrapEnsemble, Dataset, FitResult, Parameter, RunConfig, SummaryStats};
use crate::error::OrthoError;
use crate::fit::FitDriver;
use crate::models::LikelihoodModel;

pub const BUNDLE_FILE: &str = "bundle.json";
pub const FITS_FILE: &str = "fits.csv";
pub const INDICES_FILE: &str = "indices.csv";
pub const SUMMARY_FILE: &str = "summary.csv";

/// Everything needed to reprint or replay a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub tool: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub config: RunConfig,
    pub dataset: Dataset,
    pub ensemble: BootstrapEnsemble,
    pub summary: SummaryStats,
}

impl ResultBundle {
    pub fn new(config: RunConfig, dataset: Dataset, ensemble: BootstrapEnsemble, summary: SummaryStats) -> Self {
        Self {
            tool: "ortho".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            config,
            dataset,
            ensemble,
            summary,
        }
    }

    /// Stored fit for trial `k` (0 = original). `None` for failed or unknown trials.
    pub fn recorded_fit(&self, k: usize) -> Option<&FitResult> {
        if k == 0 {
            return Some(&self.ensemble.original);
        }
        self.ensemble.trials.get(k - 1).and_then(|t| t.fit.as_ref())
    }

    /// Dataset fitted by trial `k`.
    pub fn trial_dataset(&self, k: usize) -> Result<Dataset, OrthoError> {
        if k == 0 {
            return Ok(self.dataset.clone());
        }
        let nboots = self.ensemble.indices.rows();
        if k > nboots {
            return Err(OrthoError::config(format!("trial {k} out of range; bundle has {nboots} bootstrap trials")));
        }
        Ok(self.dataset.resample(self.ensemble.indices.row(k - 1)))
    }

    fn check_consistency(&self) -> Result<(), OrthoError> {
        let indices = &self.ensemble.indices;
        if indices.rows().checked_mul(indices.cols()) != Some(indices.as_slice().len()) {
            return Err(OrthoError::Serialization("index matrix shape does not match its entries".to_string()));
        }
        if indices.rows() != self.ensemble.trials.len() {
            return Err(OrthoError::Serialization(format!(
                "bundle has {} trial records but {} index rows",
                self.ensemble.trials.len(),
                indices.rows()
            )));
        }
        if indices.rows() > 0 && indices.cols() != self.dataset.len() {
            return Err(OrthoError::Serialization(format!(
                "index rows have {} columns but the dataset has {} points",
                indices.cols(),
                self.dataset.len()
            )));
        }
        if indices.as_slice().iter().any(|&i| i >= self.dataset.len()) {
            return Err(OrthoError::Serialization("index matrix refers to rows outside the dataset".to_string()));
        }
        Ok(())
    }
}

/// Write the bundle and its CSV tables into `dir`.
pub fn write_bundle(dir: &Path, bundle: &ResultBundle) -> Result<PathBuf, OrthoError> {
    let path = dir.join(BUNDLE_FILE);
    let file = File::create(&path).map_err(|e| OrthoError::io(&path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, bundle)
        .map_err(|e| OrthoError::Serialization(format!("failed to write {}: {e}", path.display())))?;
    writer.flush().map_err(|e| OrthoError::io(&path, e))?;

    write_fits_csv(&dir.join(FITS_FILE), &bundle.ensemble)?;
    write_indices_csv(&dir.join(INDICES_FILE), &bundle.ensemble)?;
    write_summary_csv(&dir.join(SUMMARY_FILE), &bundle.summary)?;

    info!(path = %path.display(), records = bundle.ensemble.record_count(), "result bundle written");
    Ok(path)
}

/// Read `bundle.json`; `path` may also name the run directory.
pub fn load_bundle(path: &Path) -> Result<ResultBundle, OrthoError> {
    let path = if path.is_dir() { path.join(BUNDLE_FILE) } else { path.to_path_buf() };
    let file = File::open(&path).map_err(|e| OrthoError::io(&path, e))?;
    let bundle: ResultBundle = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| OrthoError::Serialization(format!("invalid bundle {}: {e}", path.display())))?;
    bundle.check_consistency()?;
    Ok(bundle)
}

/// Refit trial `k` from the stored dataset and index row.
pub fn replay_trial(bundle: &ResultBundle, k: usize) -> Result<FitResult, OrthoError> {
    let data = bundle.trial_dataset(k)?;
    FitDriver::new(LikelihoodModel::new(bundle.config.rho)).fit(&data, k)
}

#[derive(Serialize)]
struct FitRow<'a> {
    trial: usize,
    status: &'a str,
    slope: Option<f64>,
    slope_unc: Option<f64>,
    intercept: Option<f64>,
    intercept_unc: Option<f64>,
    scatter: Option<f64>,
    scatter_unc: Option<f64>,
    reduced_chi2: Option<f64>,
    iterations: Option<usize>,
    failure: &'a str,
}

impl<'a> FitRow<'a> {
    fn new(trial: usize, fit: Option<&FitResult>, failure: Option<&'a str>) -> Self {
        Self {
            trial,
            status: if fit.is_some() { "converged" } else { "failed" },
            slope: fit.map(|f| f.slope),
            slope_unc: fit.map(|f| f.slope_unc),
            intercept: fit.map(|f| f.intercept),
            intercept_unc: fit.map(|f| f.intercept_unc),
            scatter: fit.map(|f| f.scatter),
            scatter_unc: fit.map(|f| f.scatter_unc),
            reduced_chi2: fit.map(|f| f.reduced_chi2),
            iterations: fit.map(|f| f.iterations),
            failure: failure.unwrap_or(""),
        }
    }
}

#[derive(Serialize)]
struct SummaryRow {
    parameter: Parameter,
    original: f64,
    median: f64,
    stdev: f64,
    median_uncertainty: f64,
}

fn csv_error(path: &Path, e: csv::Error) -> OrthoError {
    OrthoError::Serialization(format!("failed to write {}: {e}", path.display()))
}

fn write_fits_csv(path: &Path, ensemble: &BootstrapEnsemble) -> Result<(), OrthoError> {
    let mut w = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    w.serialize(FitRow::new(0, Some(&ensemble.original), None))
        .map_err(|e| csv_error(path, e))?;
    for t in &ensemble.trials {
        w.serialize(FitRow::new(t.trial, t.fit.as_ref(), t.failure.as_deref()))
            .map_err(|e| csv_error(path, e))?;
    }
    w.flush().map_err(|e| OrthoError::io(path, e))
}

fn write_indices_csv(path: &Path, ensemble: &BootstrapEnsemble) -> Result<(), OrthoError> {
    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    for row in ensemble.indices.iter_rows() {
        w.write_record(row.iter().map(|i| i.to_string()))
            .map_err(|e| csv_error(path, e))?;
    }
    w.flush().map_err(|e| OrthoError::io(path, e))
}

fn write_summary_csv(path: &Path, summary: &SummaryStats) -> Result<(), OrthoError> {
    let mut w = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    for p in summary.iter() {
        w.serialize(SummaryRow {
            parameter: p.parameter,
            original: p.original_value,
            median: p.median_across_trials,
            stdev: p.stdev_across_trials,
            median_uncertainty: p.median_reported_uncertainty,
        })
        .map_err(|e| csv_error(path, e))?;
    }
    w.flush().map_err(|e| OrthoError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SimulationConfig, simulate};
    use crate::fit::{BootstrapOrchestrator, resample_indices, summarize};

    fn small_run() -> ResultBundle {
        let data = simulate(&SimulationConfig {
            n: 12,
            scatter: 0.05,
            frac_censored_y: 0.15,
            ..SimulationConfig::default()
        })
        .unwrap();
        let mut config = RunConfig::new("synthetic.txt", "bundle-test");
        config.nboots = 8;

        let indices = resample_indices(data.len(), config.nboots, config.seed).unwrap();
        let ensemble = BootstrapOrchestrator::new(FitDriver::new(LikelihoodModel::default()))
            .run(&data, indices)
            .unwrap();
        let summary = summarize(&ensemble).unwrap();
        ResultBundle::new(config, data, ensemble, summary)
    }

    #[test]
    fn persist_then_reload_is_exact() {
        let tmp = tempfile::tempdir().unwrap();
        let bundle = small_run();
        write_bundle(tmp.path(), &bundle).unwrap();

        let loaded = load_bundle(tmp.path()).unwrap();
        assert_eq!(loaded, bundle);
        assert_eq!(loaded.ensemble.indices, bundle.ensemble.indices);

        let fits = std::fs::read_to_string(tmp.path().join(FITS_FILE)).unwrap();
        assert!(fits.starts_with("trial,status,slope"));
        assert_eq!(fits.lines().count(), 1 + bundle.ensemble.record_count());

        let indices = std::fs::read_to_string(tmp.path().join(INDICES_FILE)).unwrap();
        assert_eq!(indices.lines().count(), 8);
        assert_eq!(indices.lines().next().unwrap().split(',').count(), 12);

        let summary = std::fs::read_to_string(tmp.path().join(SUMMARY_FILE)).unwrap();
        assert!(summary.contains("\nslope,") && summary.contains("\nscatter,"));
    }

    #[test]
    fn replay_reproduces_stored_trial() {
        let bundle = small_run();
        let k = (1..=bundle.ensemble.nboots())
            .find(|&k| bundle.recorded_fit(k).is_some())
            .unwrap();
        assert_eq!(replay_trial(&bundle, k).unwrap(), *bundle.recorded_fit(k).unwrap());
        assert_eq!(replay_trial(&bundle, 0).unwrap(), bundle.ensemble.original);
        assert!(replay_trial(&bundle, 9).is_err());
    }

    #[test]
    fn inconsistent_bundle_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut bundle = small_run();
        bundle.ensemble.trials.pop();
        write_bundle(tmp.path(), &bundle).unwrap();
        assert!(matches!(load_bundle(tmp.path()), Err(OrthoError::Serialization(_))));
    }
}
