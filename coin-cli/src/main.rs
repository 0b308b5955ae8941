//! Coin drop experiment runner
//!
//! Runs a number of trials headless and prints the cumulative statistics.
//!
//! # Usage
//!
//! ```bash
//! # 10 trials of the default 10 x 10 grid
//! coin-sim --trials 10
//!
//! # Thin coins, reproducible, machine-readable report
//! coin-sim --config configs/thin_coins.yaml --trials 50 --seed 42 --json
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, info};
use serde::Serialize;

use coin_core::config::ExperimentConfig;
use coin_core::experiment::ExperimentManager;
use coin_core::stats::{Tally, TrialReport};
use coin_core::types::Orientation;
use coin_core::world::SimpleWorld;

/// Coin drop Monte Carlo experiment
#[derive(Parser, Debug)]
#[command(name = "coin-sim")]
#[command(author, version, about = "Estimate heads/tails/side probabilities of dropped coins", long_about = None)]
struct Cli {
    /// Experiment configuration (YAML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of trials to run
    #[arg(short, long, default_value = "1")]
    trials: usize,

    /// Simulation tick length in seconds
    #[arg(long, default_value = "0.016666666666666666")]
    dt: f64,

    /// Give up on a trial after this many ticks
    #[arg(long, default_value = "36000")]
    max_ticks: usize,

    /// RNG seed, overriding the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Coin shape parameter in [0, 1], overriding the configuration
    #[arg(long)]
    shape_parameter: Option<f64>,

    /// Logging filter (env_logger syntax, e.g. "info" or "coin_core=debug")
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    config: &'a ExperimentConfig,
    trials: &'a [TrialReport],
    tally: &'a Tally,
}

fn load_config(cli: &Cli) -> Result<ExperimentConfig> {
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ExperimentConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(shape) = cli.shape_parameter {
        config.coin.shape_parameter = shape;
    }
    Ok(config)
}

/// Drive the experiment until `trials` trials have finished.
///
/// Works with and without `automate`: without it each trial is started here.
fn run(manager: &mut ExperimentManager<SimpleWorld>, cli: &Cli) -> Result<Vec<TrialReport>> {
    let mut reports = Vec::with_capacity(cli.trials);
    if cli.trials == 0 {
        return Ok(reports);
    }

    manager.start_trial()?;
    let mut ticks = 0;
    while reports.len() < cli.trials {
        if let Some(report) = manager.tick(cli.dt) {
            debug!("Trial {} took {} ticks", report.trial, ticks + 1);
            reports.push(report);
            ticks = 0;
            if reports.len() < cli.trials && !manager.is_running() {
                manager.start_trial()?;
            }
            continue;
        }

        ticks += 1;
        if ticks >= cli.max_ticks {
            bail!(
                "trial {} did not finish within {} ticks of {}s; raise --max-ticks or lower timeout_secs",
                manager.trials_completed(),
                cli.max_ticks,
                cli.dt
            );
        }
    }
    Ok(reports)
}

fn print_report(reports: &[TrialReport], tally: &Tally) {
    for r in reports {
        println!(
            "trial {:>4}: {:>4} heads {:>4} tails {:>4} side {:>4} undetermined  ({:.2}s{})",
            r.trial,
            r.counts.heads,
            r.counts.tails,
            r.counts.side,
            r.counts.undetermined,
            r.elapsed_secs,
            if r.timed_out {
                format!(", timed out, {} excluded", r.coins_excluded)
            } else {
                String::new()
            }
        );
    }

    println!();
    println!("{:<14} {:>8} {:>10}", "orientation", "count", "p");
    for o in Orientation::ALL {
        println!("{:<14} {:>8} {:>10.4}", o.as_str(), tally.count(o), tally.probability(o));
    }
    println!("{:<14} {:>8}", "total", tally.total());
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .try_init()?;

    info!("coin-sim v{}", env!("CARGO_PKG_VERSION"));

    if !(cli.dt.is_finite() && cli.dt > 0.0) {
        bail!("--dt must be a positive number of seconds, got {}", cli.dt);
    }

    let config = load_config(&cli)?;
    info!(
        "{} trials of {} coins, shape parameter {}",
        cli.trials,
        config.coins_per_trial(),
        config.coin.shape_parameter
    );

    let mut manager =
        ExperimentManager::simulated(config).context("invalid experiment configuration")?;
    let reports = run(&mut manager, &cli)?;

    if cli.json {
        let summary = Summary {
            config: manager.config(),
            trials: &reports,
            tally: manager.tally(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_report(&reports, manager.tally());
    }

    Ok(())
}
