//! Fleetwatch CLI
//!
//! Thin harness around the engine: loads configuration, seeds the fleet, and
//! either prints the current views or drives simulated activity through the
//! normal producer operations.

use anyhow::Result;
use clap::{Parser, Subcommand};
use fleetwatch_core::{FleetConfig, FleetEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "fleetwatch")]
#[command(about = "Fleet telemetry and coordination-graph engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file (defaults are used when it does not exist)
    #[arg(long, env = "FLEETWATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the dashboard summary for the seeded fleet
    Summary,

    /// Drive random activity through the engine, then print fleet views
    Simulate {
        /// Number of update rounds per agent
        #[arg(long, default_value = "20")]
        ticks: u32,

        /// Delay between rounds
        #[arg(long, default_value = "50")]
        interval_ms: u64,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write the default configuration file
    InitConfig {
        /// Destination path
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::new(format!(
        "fleetwatch={level},fleetwatch_core={level}",
        level = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Fleetwatch v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.unwrap_or_else(FleetConfig::default_path);

    match cli.command {
        Commands::Summary => {
            let config = FleetConfig::load(&config_path)?;
            let engine = FleetEngine::from_config(&config)?;
            cli::print_json(&engine.dashboard_summary()?)?;
        }
        Commands::Simulate {
            ticks,
            interval_ms,
            seed,
        } => {
            let config = FleetConfig::load(&config_path)?;
            let engine = Arc::new(FleetEngine::from_config(&config)?);
            let options = cli::simulate::SimulationOptions {
                ticks,
                interval: std::time::Duration::from_millis(interval_ms),
                seed: seed.unwrap_or_else(rand::random),
            };
            cli::simulate::run(engine.clone(), options).await?;

            cli::print_json(&engine.dashboard_summary()?)?;
            cli::print_json(&engine.workload_distribution()?)?;
            cli::print_json(&engine.coordination_efficiency()?)?;
        }
        Commands::InitConfig { path } => {
            let path = path.unwrap_or(config_path);
            if path.exists() {
                anyhow::bail!("Refusing to overwrite existing config: {}", path.display());
            }
            FleetConfig::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}
