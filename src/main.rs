mod agent;
mod config;
mod engine;
mod error;
mod grid;
mod model;
mod stats;
mod sweep;

use crate::config::Config;
use crate::engine::Engine;
use crate::sweep::Sweeper;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::Serialize;
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// TOML configuration file (defaults are used when omitted).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed of the random number generator (drawn from the OS when omitted).
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single simulation until nobody is contagious.
    Run {
        /// Write the daily history and outcome to this JSON file.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Sweep population density and symptom probability.
    Sweep {
        /// Write every sweep result to this JSON file.
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct RunReport<'a> {
    outcome: &'a stats::Outcome,
    history: &'a [stats::DayRecord],
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let cfg = match &args.config {
        Some(file) => Config::from_file(file).context("failed to construct cfg")?,
        None => Config::default(),
    };
    log::info!("{cfg:#?}");

    let rng = match args.seed {
        Some(seed) => ChaCha12Rng::seed_from_u64(seed),
        None => ChaCha12Rng::try_from_os_rng()?,
    };

    match args.command {
        Command::Run { report } => run_simulation(cfg, rng, report.as_deref())?,
        Command::Sweep { report } => run_sweep(cfg, rng, report.as_deref())?,
    }

    Ok(())
}

fn run_simulation(cfg: Config, rng: ChaCha12Rng, report: Option<&Path>) -> Result<()> {
    let mut engine = Engine::generate_initial_condition(cfg, rng)
        .context("failed to generate initial condition")?;
    let snapshot_interval = engine.cfg().output.snapshot_interval;
    log::info!(
        "placed {} agents, {} of them infected",
        engine.n_agents(),
        engine.tally().infected
    );

    let outcome = engine.run_with(|engine| {
        if log::log_enabled!(log::Level::Trace) && engine.clock() % snapshot_interval == 0 {
            log::trace!("{}", engine.snapshot());
        }
    });
    log::info!("{outcome}");
    log::info!("{} agents were infected", engine.n_ever_infected());

    if let Some(file) = report {
        let run_report = RunReport {
            outcome: &outcome,
            history: engine.recorder().history(),
        };
        save_json(file, &run_report).context("failed to save run report")?;
    }

    Ok(())
}

fn run_sweep(cfg: Config, rng: ChaCha12Rng, report: Option<&Path>) -> Result<()> {
    let sweeper = Sweeper::new(cfg, rng).context("failed to construct sweeper")?;
    let sweep_report = sweeper.perform_sweep().context("failed to perform sweep")?;

    for (label, result) in [("max", &sweep_report.max), ("min", &sweep_report.min)] {
        log::info!(
            "{label} peak of {} symptomatic agents at density {} and symptom probability {}",
            result.peak_symptomatic(),
            result.density,
            result.prob_symptom
        );
    }

    if let Some(file) = report {
        save_json(file, &sweep_report).context("failed to save sweep report")?;
    }

    Ok(())
}

fn save_json<T: Serialize, P: AsRef<Path>>(file: P, value: &T) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value).context("failed to serialize value")?;
    Ok(())
}
