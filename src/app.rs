//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - runs the fit pipeline, or reloads a saved bundle
//! - prints reports/plots to stdout

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command, FitArgs, ReplayArgs, SimulateArgs, SummaryArgs};
use crate::data::{SimulationConfig, simulate};
use crate::domain::RunConfig;
use crate::error::OrthoError;
use crate::io::{load_bundle, replay_trial, write_dataset};
use crate::plot::render_ascii_plot;
use crate::report::{format_replay, format_report};

pub mod pipeline;

/// Entry point for the `ortho` binary.
pub fn run() -> Result<(), OrthoError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(&args, cli.verbose),
        Command::Summary(args) => handle_summary(&args),
        Command::Replay(args) => handle_replay(&args),
        Command::Simulate(args) => handle_simulate(&args),
    }
}

fn handle_fit(args: &FitArgs, verbose: bool) -> Result<(), OrthoError> {
    let config = run_config_from_args(args, verbose);
    let run = pipeline::run_fit(&config)?;

    println!("{}", format_report(&config, &run.dataset, &run.ensemble, &run.summary));
    if config.plot {
        println!(
            "{}",
            render_ascii_plot(&run.dataset, &run.ensemble, Some(&run.summary), args.width, args.height)
        );
    }
    println!("Results written to {}", run.run_dir.display());
    Ok(())
}

fn handle_summary(args: &SummaryArgs) -> Result<(), OrthoError> {
    let bundle = load_bundle(&args.bundle)?;
    info!(created_at = %bundle.created_at.to_rfc3339(), version = %bundle.version, "loaded bundle");

    println!(
        "{}",
        format_report(&bundle.config, &bundle.dataset, &bundle.ensemble, &bundle.summary)
    );
    if args.plot {
        println!(
            "{}",
            render_ascii_plot(&bundle.dataset, &bundle.ensemble, Some(&bundle.summary), args.width, args.height)
        );
    }
    Ok(())
}

fn handle_replay(args: &ReplayArgs) -> Result<(), OrthoError> {
    let bundle = load_bundle(&args.bundle)?;
    let replayed = replay_trial(&bundle, args.trial)?;
    println!("{}", format_replay(args.trial, &replayed, bundle.recorded_fit(args.trial)));
    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), OrthoError> {
    let data = simulate(&SimulationConfig {
        n: args.n,
        intercept: args.intercept,
        slope: args.slope,
        scatter: args.scatter,
        sigma_x: args.noise,
        sigma_y: args.noise,
        x_min: args.x_min,
        x_max: args.x_max,
        frac_censored_y: args.frac_censored_y,
        frac_censored_x: args.frac_censored_x,
        frac_censored_both: args.frac_censored_both,
        seed: args.seed,
        ..SimulationConfig::default()
    })?;
    write_dataset(&args.out, &data)?;
    info!(path = %args.out.display(), n = data.len(), "synthetic dataset written");
    Ok(())
}

pub fn run_config_from_args(args: &FitArgs, verbose: bool) -> RunConfig {
    RunConfig {
        dataset_path: args.dataset.clone(),
        nboots: args.nboots,
        run_name: args.name.clone(),
        output_dir: args.output_dir.clone(),
        overwrite: args.overwrite,
        rho: args.rho,
        plot: args.plot,
        verbose,
        seed: args.seed,
        x_column: args.x_column,
        y_column: args.y_column,
        allow_large_nboots: args.allow_large_nboots,
        parallel: !args.sequential,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_map_onto_run_config() {
        let cli = Cli::parse_from([
            "ortho", "fit", "obs.txt", "--name", "r1", "-b", "250", "--sequential", "--overwrite", "--plot",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = run_config_from_args(&args, true);

        assert_eq!(config.nboots, 250);
        assert_eq!(config.run_name, "r1");
        assert!(!config.parallel && config.overwrite && config.plot && config.verbose);
        assert_eq!(config.run_dir(), std::path::PathBuf::from("./r1"));
        assert!(config.validate().is_ok());
    }
}
