//! flipstack CLI
//!
//! Runs navigation scenarios headless and inspects engine configuration.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flipstack_stack::NavigationConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod report;
mod runner;
mod scenario;

use runner::RunConfig;
use scenario::Scenario;

#[derive(Parser)]
#[command(name = "flipstack")]
#[command(author, version, about = "Headless driver for the flipstack section navigation engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and print its report
    Run {
        /// Scenario file (.json or .toml)
        scenario: PathBuf,

        /// Engine configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also write the report to this relative path
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Virtual frame rate
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=1000))]
        fps: u32,
    },
    /// Print the engine configuration as TOML
    Config {
        /// Load and validate this file instead of printing the defaults
        path: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dispatch(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn dispatch(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Run {
            scenario,
            config,
            report,
            fps,
        } => run(&scenario, config.as_deref(), report.as_deref(), fps),
        Commands::Config { path } => {
            print_config(path.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<NavigationConfig> {
    match path {
        Some(path) => NavigationConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(NavigationConfig::default()),
    }
}

fn run(
    scenario_path: &Path,
    config_path: Option<&Path>,
    report_path: Option<&Path>,
    fps: u32,
) -> Result<ExitCode> {
    let scenario = Scenario::from_path(scenario_path)?;
    let config = load_config(config_path)?;
    tracing::info!(
        "running {} ({} steps, {} assertions) at {} fps",
        scenario_path.display(),
        scenario.steps.len(),
        scenario.steps.iter().filter(|step| step.is_assertion()).count(),
        fps
    );

    let outcome = runner::run_loaded_scenario(&scenario, config, RunConfig { fps })?;
    let report = outcome.report();
    report.write_to_writer(&mut std::io::stdout().lock())?;
    if let Some(path) = report_path {
        report
            .write_to_path(path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
    }

    if outcome.is_failed() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_config(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let rendered = config
        .to_toml_string()
        .context("failed to render config as TOML")?;
    print!("{rendered}");
    Ok(())
}
