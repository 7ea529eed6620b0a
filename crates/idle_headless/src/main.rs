//! Headless idle engine runner.
//!
//! Runs the engine without graphics for CI, balance checks and save
//! inspection. Reports are JSON on stdout; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Simulate a seeded session and print a summary
//! cargo run -p idle_headless -- run --seed 42 --frames 3600 --dt 16
//!
//! # Keep the end state as a save file
//! cargo run -p idle_headless -- run --seed 42 --frames 3600 --save save.json
//!
//! # Project offline gains onto a save
//! cargo run -p idle_headless -- offline --save save.json --hours 30
//!
//! # Check catalogs
//! cargo run -p idle_headless -- validate --buildings buildings.ron --pets pets.ron
//!
//! # Verify determinism by running the same seed several times
//! cargo run -p idle_headless -- verify --seed 42 --runs 5
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use idle_headless::runner::{self, RunConfig};
use idle_headless::validate::{validate_file, CatalogKind};
use idle_headless::Result;

#[derive(Parser)]
#[command(name = "idle_headless")]
#[command(about = "Headless idle engine runner for CI and balance checks")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a seeded session
    Run {
        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Frames to simulate
        #[arg(short, long, default_value = "3600")]
        frames: u64,

        /// Frame length in milliseconds
        #[arg(long, default_value = "16", value_parser = clap::value_parser!(u32).range(1..=1000))]
        dt: u32,

        /// Player level to start at
        #[arg(short, long, default_value = "1")]
        level: u32,

        /// Write the end state to this save file
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Apply offline progress to a save file
    Offline {
        /// Save file to load
        #[arg(short, long)]
        save: PathBuf,

        /// Hours away from the game
        #[arg(long)]
        hours: f64,
    },

    /// Check RON catalogs for broken invariants
    Validate {
        /// Building catalog
        #[arg(long)]
        buildings: Option<PathBuf>,

        /// Pet catalog
        #[arg(long)]
        pets: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Frames per run
        #[arg(short, long, default_value = "3600")]
        frames: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr, stdout is for reports
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let outcome = match cli.command {
        Commands::Run {
            seed,
            frames,
            dt,
            level,
            save,
        } => cmd_run(
            RunConfig {
                seed,
                frames,
                dt_ms: dt,
                level: level.max(1),
            },
            save,
        ),
        Commands::Offline { save, hours } => cmd_offline(save, hours),
        Commands::Validate { buildings, pets } => cmd_validate(buildings, pets),
        Commands::Verify { seed, frames, runs } => cmd_verify(seed, frames, runs),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("FATAL: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run a seeded session
fn cmd_run(config: RunConfig, save: Option<PathBuf>) -> Result<ExitCode> {
    let (session, summary) = runner::run(&config);
    if let Some(path) = save {
        runner::write_save(&session, &path, summary.elapsed_ms)?;
    }
    print_json(&summary)?;
    Ok(ExitCode::SUCCESS)
}

/// Project offline gains onto a save
fn cmd_offline(save: PathBuf, hours: f64) -> Result<ExitCode> {
    let summary = runner::project_offline(&save, hours)?;
    print_json(&summary)?;
    Ok(ExitCode::SUCCESS)
}

/// Validate the given catalogs
fn cmd_validate(buildings: Option<PathBuf>, pets: Option<PathBuf>) -> Result<ExitCode> {
    let targets: Vec<(CatalogKind, PathBuf)> = buildings
        .map(|p| (CatalogKind::Buildings, p))
        .into_iter()
        .chain(pets.map(|p| (CatalogKind::Pets, p)))
        .collect();

    if targets.is_empty() {
        eprintln!("Nothing to validate: pass --buildings and/or --pets");
        return Ok(ExitCode::FAILURE);
    }

    let mut reports = Vec::with_capacity(targets.len());
    for (kind, path) in targets {
        reports.push(validate_file(kind, &path)?);
    }
    print_json(&reports)?;

    if reports.iter().all(|r| r.is_valid()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Verify that repeated runs end in the same state
fn cmd_verify(seed: u64, frames: u64, runs: u32) -> Result<ExitCode> {
    tracing::info!(seed, frames, runs, "Verifying determinism");

    let config = RunConfig {
        seed,
        frames,
        ..RunConfig::default()
    };
    let report = runner::verify(&config, runs);
    print_json(&report)?;

    if report.deterministic {
        eprintln!("PASS: All {runs} runs produced identical results");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        Ok(ExitCode::FAILURE)
    }
}
