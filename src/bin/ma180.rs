//! 180-Day Moving Average Precomputation
//!
//! Reads intraday or daily BTC prices, keeps the last close of each day and
//! writes their trailing 180-day mean.
//!
//! ## Usage
//! ```bash
//! cargo run --bin ma180 --release -- btcdata.csv btc_ma180.csv
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use moc_simulation::data::load_price_data;
use moc_simulation::logging::init_logging_from_env;
use moc_simulation::ma180::{compute_ma180, write_ma_table};

#[derive(Parser)]
#[command(name = "ma180")]
#[command(about = "Precompute the 180-day moving average table", long_about = None)]
struct Cli {
    #[arg(default_value = "btcdata.csv")]
    price_file: PathBuf,

    #[arg(default_value = "btc_ma180.csv")]
    output_file: PathBuf,
}

fn main() -> Result<()> {
    init_logging_from_env().map_err(|e| anyhow::anyhow!("logging init failed: {e}"))?;
    let cli = Cli::parse();

    let points = load_price_data(&cli.price_file, false)
        .with_context(|| format!("Failed to load prices: {}", cli.price_file.display()))?;
    let table = compute_ma180(&points)?;
    write_ma_table(&cli.output_file, &table)
        .with_context(|| format!("Failed to write: {}", cli.output_file.display()))?;

    println!("Generated: {} ({} days)", cli.output_file.display(), table.len());
    Ok(())
}
