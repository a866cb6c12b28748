//! icnsim — run caching-strategy simulations and summarise their results.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use icnsim::config::Config;
use icnsim::results::ResultSet;
use icnsim::runner::run_config;

/// Packet-level simulator for in-network caching strategies.
#[derive(Parser)]
#[command(name = "icnsim")]
#[command(version = icnsim::PKG_VERSION)]
#[command(about = "Discrete-event simulator for in-network caching strategies")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the experiments in a configuration file.
    Run {
        /// Path to the TOML configuration.
        config: PathBuf,
        /// Where to write the result set (JSON).
        #[arg(short, long)]
        results: PathBuf,
    },
    /// Project a result set into per-metric CSV summaries.
    Plot {
        /// Path to the TOML configuration the results were produced from.
        config: PathBuf,
        /// Path to the result set written by `run`.
        #[arg(short, long)]
        results: PathBuf,
        /// Directory for the CSV files.
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    // Initialise tracing with RUST_LOG env filter (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn execute(args: Args) -> icnsim::Result<()> {
    match args.command {
        Command::Run { config, results } => {
            let config = Config::load(&config)?;
            info!(experiments = config.experiments.len(), "configuration loaded");
            let set = run_config(&config)?;
            set.write(&results)?;
            Ok(())
        }
        Command::Plot {
            config,
            results,
            output,
        } => {
            let config = Config::load(&config)?;
            let set = ResultSet::read(&results)?;
            if set.len() != config.experiments.len() {
                tracing::warn!(
                    results = set.len(),
                    experiments = config.experiments.len(),
                    "result set does not match the configuration"
                );
            }
            let files = set.write_csv_summaries(&output)?;
            for file in files {
                info!(?file, "wrote summary");
            }
            Ok(())
        }
    }
}
