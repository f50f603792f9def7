//! Command-line parsing for the censored orthogonal regression tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{DEFAULT_NBOOTS, DEFAULT_SEED};
use crate::plot::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "ortho",
    version,
    about = "Orthogonal regression with upper limits and bootstrap uncertainties"
)]
pub struct Cli {
    /// Debug-level logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a dataset, bootstrap it, print the summary and persist the bundle.
    Fit(FitArgs),
    /// Reprint the report of a saved run.
    Summary(SummaryArgs),
    /// Refit one stored trial and compare it with the saved record.
    Replay(ReplayArgs),
    /// Write a synthetic dataset drawn from a known line.
    Simulate(SimulateArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Dataset file (`x sx cx y sy cy` rows).
    #[arg(value_name = "DATASET")]
    pub dataset: PathBuf,

    /// Run name; results go to `<output-dir>/<name>/`.
    #[arg(short = 'n', long)]
    pub name: String,

    /// Number of bootstrap draws.
    #[arg(short = 'b', long, default_value_t = DEFAULT_NBOOTS)]
    pub nboots: usize,

    /// Parent directory for run outputs.
    #[arg(short = 'o', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Reuse an existing run directory.
    #[arg(long)]
    pub overwrite: bool,

    /// Correlation between the x and y measurement errors.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub rho: f64,

    /// Render an ASCII plot after the report.
    #[arg(long)]
    pub plot: bool,

    /// Resampler seed.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Quantity (0-based triple) used as X in multi-quantity files.
    #[arg(long, default_value_t = 0)]
    pub x_column: usize,

    /// Quantity (0-based triple) used as Y in multi-quantity files.
    #[arg(long, default_value_t = 1)]
    pub y_column: usize,

    /// Permit more than 10000 bootstrap draws.
    #[arg(long)]
    pub allow_large_nboots: bool,

    /// Run bootstrap trials on a single thread.
    #[arg(long)]
    pub sequential: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: usize,
}

#[derive(Debug, Parser)]
pub struct SummaryArgs {
    /// `bundle.json` or its run directory.
    #[arg(value_name = "BUNDLE")]
    pub bundle: PathBuf,

    /// Render an ASCII plot after the report.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: usize,
}

#[derive(Debug, Parser)]
pub struct ReplayArgs {
    /// `bundle.json` or its run directory.
    #[arg(value_name = "BUNDLE")]
    pub bundle: PathBuf,

    /// Trial to refit (0 = original dataset).
    #[arg(short = 'k', long)]
    pub trial: usize,
}

#[derive(Debug, Parser)]
pub struct SimulateArgs {
    /// Output dataset file.
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Number of points.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub n: usize,

    #[arg(long, default_value_t = 2.0, allow_negative_numbers = true)]
    pub slope: f64,

    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub intercept: f64,

    /// Intrinsic scatter in y.
    #[arg(long, default_value_t = 0.0)]
    pub scatter: f64,

    /// Measurement noise on both axes.
    #[arg(long, default_value_t = 0.05)]
    pub noise: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub x_min: f64,

    #[arg(long, default_value_t = 3.0, allow_negative_numbers = true)]
    pub x_max: f64,

    /// Fraction of points turned into Y upper limits.
    #[arg(long, default_value_t = 0.0)]
    pub frac_censored_y: f64,

    /// Fraction of points turned into X upper limits.
    #[arg(long, default_value_t = 0.0)]
    pub frac_censored_x: f64,

    /// Fraction of points censored on both axes.
    #[arg(long, default_value_t = 0.0)]
    pub frac_censored_both: f64,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults() {
        let cli = Cli::parse_from(["ortho", "fit", "data.txt", "--name", "run1"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.nboots, DEFAULT_NBOOTS);
        assert_eq!(args.seed, DEFAULT_SEED);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert_eq!((args.x_column, args.y_column), (0, 1));
        assert!(!args.sequential && !args.overwrite && !cli.verbose);
    }

    #[test]
    fn negative_rho_and_global_verbose() {
        let cli = Cli::parse_from(["ortho", "fit", "d.txt", "-n", "r", "--rho", "-0.3", "-v"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.rho, -0.3);
        assert!(cli.verbose);
    }

    #[test]
    fn replay_requires_trial() {
        assert!(Cli::try_parse_from(["ortho", "replay", "bundle.json"]).is_err());
        let cli = Cli::parse_from(["ortho", "replay", "bundle.json", "--trial", "4"]);
        assert!(matches!(cli.command, Command::Replay(ReplayArgs { trial: 4, .. })));
    }
}
