//! Report Export Binary
//!
//! Runs the rolling-average driver and writes one report row per price point.
//!
//! ## Usage
//! ```bash
//! cargo run --bin export --release -- btcdata.csv config.json output.csv
//! cargo run --bin export --release -- --weekly btcdata.csv config.json weekly.csv
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use moc_simulation::config::SimConfig;
use moc_simulation::data::load_price_data;
use moc_simulation::historical::run_rolling;
use moc_simulation::logging::init_logging_from_env;
use moc_simulation::report::write_report;

#[derive(Parser)]
#[command(name = "export")]
#[command(about = "Export per-point protocol metrics to CSV", long_about = None)]
struct Cli {
    #[arg(default_value = "btcdata.csv")]
    price_file: PathBuf,

    #[arg(default_value = "config.json")]
    config_file: PathBuf,

    #[arg(default_value = "output.csv")]
    output_file: PathBuf,

    /// Keep only every 7th price row
    #[arg(long)]
    weekly: bool,
}

fn main() -> Result<()> {
    init_logging_from_env().map_err(|e| anyhow::anyhow!("logging init failed: {e}"))?;
    let cli = Cli::parse();

    let system = SimConfig::from_path(&cli.config_file)
        .with_context(|| format!("Failed to load config: {}", cli.config_file.display()))?
        .into_system();
    let prices = load_price_data(&cli.price_file, cli.weekly)
        .with_context(|| format!("Failed to load prices: {}", cli.price_file.display()))?;

    let (_, _, rows) = run_rolling(system, &prices)?;
    write_report(&cli.output_file, &rows)
        .with_context(|| format!("Failed to write report: {}", cli.output_file.display()))?;

    info!(rows = rows.len(), path = %cli.output_file.display(), "report exported");
    println!("Wrote {} rows to {}", rows.len(), cli.output_file.display());
    Ok(())
}
