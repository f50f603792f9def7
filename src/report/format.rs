//! Formatted terminal output for a bootstrap run.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized

use std::path::Path;

use crate::domain::{BootstrapEnsemble, Dataset, FitResult, RunConfig, SummaryStats};
use crate::models::{Censoring, censoring_counts};

/// Full report: header, original fit, bootstrap table.
pub fn format_report(config: &RunConfig, data: &Dataset, ensemble: &BootstrapEnsemble, summary: &SummaryStats) -> String {
    let mut out = format_run_header(config, data);
    out.push('\n');
    out.push_str(&format_original_fit(&ensemble.original));
    out.push('\n');
    out.push_str(&format_summary_table(summary));
    out
}

pub fn format_run_header(config: &RunConfig, data: &Dataset) -> String {
    let mut out = String::new();

    out.push_str("=== ortho - censored orthogonal regression ===\n");
    out.push_str(&format!("Dataset: {}\n", display_path(&config.dataset_path)));
    out.push_str(&format!("Run: {} ({})\n", config.run_name, display_path(&config.run_dir())));

    let counts = censoring_counts(data.points());
    let parts: Vec<String> = Censoring::ALL
        .iter()
        .zip(counts)
        .map(|(c, n)| format!("{}={n}", c.display_name()))
        .collect();
    out.push_str(&format!("Points: n={} | {}\n", data.len(), parts.join(" | ")));
    out.push_str(&format!("Bootstrap: nboots={} | seed={}\n", config.nboots, config.seed));
    if config.rho != 0.0 {
        out.push_str(&format!("Error correlation: rho={:.3}\n", config.rho));
    }

    out
}

pub fn format_original_fit(fit: &FitResult) -> String {
    let mut out = String::new();
    out.push_str("Original fit:\n");
    out.push_str(&format!("- slope     : {:>12.6} +/- {:.6}\n", fit.slope, fit.slope_unc));
    out.push_str(&format!("- intercept : {:>12.6} +/- {:.6}\n", fit.intercept, fit.intercept_unc));
    out.push_str(&format!("- scatter   : {:>12.6} +/- {:.6}\n", fit.scatter, fit.scatter_unc));
    out.push_str(&format!("- reduced chi2: {:.4} ({} iterations)\n", fit.reduced_chi2, fit.iterations));
    out
}

/// One row per parameter plus the trial accounting line.
pub fn format_summary_table(summary: &SummaryStats) -> String {
    let mut out = String::new();
    out.push_str("Bootstrap summary:\n");
    out.push_str(
        format!(
            "{:<10} {:>12} {:>12} {:>12} {:>12}\n",
            "parameter", "original", "median", "stdev", "median_unc"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<12} {:-<12} {:-<12} {:-<12}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for p in summary.iter() {
        out.push_str(&format!(
            "{:<10} {:>12.6} {:>12.6} {:>12.6} {:>12.6}\n",
            p.parameter.display_name(),
            p.original_value,
            p.median_across_trials,
            p.stdev_across_trials,
            p.median_reported_uncertainty,
        ));
    }

    out.push_str(&format!(
        "\nTrials: used={} | failed={}\n",
        summary.trials_used, summary.trials_failed
    ));
    out
}

/// Side-by-side comparison of a replayed trial with its stored record.
pub fn format_replay(trial: usize, replayed: &FitResult, recorded: Option<&FitResult>) -> String {
    let mut out = String::new();
    out.push_str(&format!("Replay of trial {trial}:\n"));
    out.push_str(format!("{:<12} {:>14} {:>14}\n", "", "replayed", "recorded").trim_end());
    out.push('\n');

    let rows: [(&str, fn(&FitResult) -> f64); 7] = [
        ("slope", |f| f.slope),
        ("slope_unc", |f| f.slope_unc),
        ("intercept", |f| f.intercept),
        ("intercept_unc", |f| f.intercept_unc),
        ("scatter", |f| f.scatter),
        ("scatter_unc", |f| f.scatter_unc),
        ("reduced_chi2", |f| f.reduced_chi2),
    ];
    for (name, get) in rows {
        let stored = recorded.map(|r| format!("{:>14.8}", get(r))).unwrap_or_else(|| format!("{:>14}", "-"));
        out.push_str(&format!("{name:<12} {:>14.8} {stored}\n", get(replayed)));
    }

    let verdict = match recorded {
        Some(r) if r == replayed => "identical to the stored record",
        Some(_) => "DIFFERS from the stored record",
        None => "stored trial had failed; no record to compare",
    };
    out.push_str(&format!("Result: {verdict}\n"));
    out
}

fn display_path(path: &Path) -> String {
    truncate(&path.display().to_string(), 60)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
