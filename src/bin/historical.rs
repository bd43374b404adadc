//! Historical Replay Binary
//!
//! Replays a BTC price history through the protocol. By default every day
//! runs the full step (rebalance, user emission, interest vs. funding rate).
//! `--rolling` uses the rolling-average driver instead.
//!
//! ## Usage
//! ```bash
//! cargo run --bin historical --release -- \
//!     --config config.json --prices btcdata.csv \
//!     --funding merged_btc_funding.csv --ma180 btc_ma180.csv
//!
//! cargo run --bin historical --release -- --rolling --prices btcdata.csv
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use moc_simulation::config::SimConfig;
use moc_simulation::data::{daily_closes, load_price_data, FundingRateTable, MovingAverageTable};
use moc_simulation::historical::{run_rolling, run_with_deposit};
use moc_simulation::logging::init_logging_from_env;
use moc_simulation::report::{format_summary, write_report};

#[derive(Parser)]
#[command(name = "historical")]
#[command(about = "Replay a BTC price history through the protocol", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[arg(short, long, default_value = "btcdata.csv")]
    prices: PathBuf,

    /// Daily market funding rates (date,funding_rate_daily)
    #[arg(short, long, default_value = "merged_btc_funding.csv")]
    funding: PathBuf,

    /// Precomputed 180-day averages (date,ma180)
    #[arg(short, long, default_value = "btc_ma180.csv")]
    ma180: PathBuf,

    /// Use the rolling-average driver
    #[arg(long)]
    rolling: bool,

    /// With --rolling, use every price row instead of weekly samples
    #[arg(long)]
    daily: bool,

    /// Write the per-point report CSV here
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging_from_env().map_err(|e| anyhow::anyhow!("logging init failed: {e}"))?;
    let cli = Cli::parse();

    let config = SimConfig::from_path(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    info!(config = %serde_json::to_string(&config)?, "initial state");
    let system = config.into_system();

    let rows = if cli.rolling {
        let prices = load_price_data(&cli.prices, !cli.daily)
            .with_context(|| format!("Failed to load prices: {}", cli.prices.display()))?;
        let (system, steps, rows) = run_rolling(system, &prices)?;

        for s in &steps {
            println!(
                "{} Price:{:.2} DoC:{:.2} BTC:{:.4} Avail:{:.2} tCov:{:.2} rCov:{:.2} DeltaDoC:{:.2}",
                s.date,
                s.price,
                s.doc_supply,
                s.btc_collateral,
                s.doc_available,
                s.target_coverage,
                s.real_coverage,
                s.change_doc
            );
        }
        println!();
        println!("Final State:");
        println!("{}", format_summary(&system));
        rows
    } else {
        let points = load_price_data(&cli.prices, false)
            .with_context(|| format!("Failed to load prices: {}", cli.prices.display()))?;
        let closes = daily_closes(&points)?;
        let ma_table = MovingAverageTable::load(&cli.ma180)
            .with_context(|| format!("Failed to load MA table: {}", cli.ma180.display()))?;
        let funding = FundingRateTable::load(&cli.funding)
            .with_context(|| format!("Failed to load funding: {}", cli.funding.display()))?;

        let run = run_with_deposit(system, &closes, &ma_table, &funding);

        println!("=======================================================");
        println!("  Final results");
        println!("=======================================================");
        println!("  DoC in vault deposit:  {:.4}", run.system.vault_docs);
        println!("  Total DoC issued:      {:.4}", run.system.doc_supply);
        println!("  BTC in collateral:     {:.6}", run.system.btc_collateral);
        run.rows
    };

    if let Some(output) = cli.output {
        write_report(&output, &rows)
            .with_context(|| format!("Failed to write report: {}", output.display()))?;
        info!(path = %output.display(), rows = rows.len(), "report written");
    }

    Ok(())
}
