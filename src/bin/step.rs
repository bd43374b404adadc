//! Step-Through Historical Viewer
//!
//! Advances one price point per Enter and shows the panel before and after
//! the supply rebalance. `q` quits.
//!
//! ## Usage
//! ```bash
//! cargo run --bin step -- btcdata.csv config.json
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use moc_simulation::config::SimConfig;
use moc_simulation::data::load_price_data;
use moc_simulation::historical::RollingSimulation;
use moc_simulation::logging::init_logging_from_env;
use moc_simulation::report::format_panel;

#[derive(Parser)]
#[command(name = "step")]
#[command(about = "Step through a price history one point at a time", long_about = None)]
struct Cli {
    #[arg(default_value = "btcdata.csv")]
    price_file: PathBuf,

    #[arg(default_value = "config.json")]
    config_file: PathBuf,

    /// Use every price row instead of weekly samples
    #[arg(long)]
    daily: bool,
}

fn main() -> Result<()> {
    init_logging_from_env().map_err(|e| anyhow::anyhow!("logging init failed: {e}"))?;
    let cli = Cli::parse();

    let system = SimConfig::from_path(&cli.config_file)
        .with_context(|| format!("Failed to load config: {}", cli.config_file.display()))?
        .into_system();
    let prices = load_price_data(&cli.price_file, !cli.daily)
        .with_context(|| format!("Failed to load prices: {}", cli.price_file.display()))?;

    let mut sim = RollingSimulation::new(system);
    let stdin = io::stdin();
    let mut input = stdin.lock().lines();
    let mut out = io::stdout().lock();

    writeln!(out, "Interactive historical simulation. Press Enter to advance.")?;
    writeln!(out, "{}", format_panel(&sim.system))?;

    for (date, price) in &prices {
        write!(out, "\nPress Enter to continue, or 'q' to quit: ")?;
        out.flush()?;
        let Some(line) = input.next() else {
            break;
        };
        if line?.trim().eq_ignore_ascii_case("q") {
            break;
        }

        sim.observe(*price);
        writeln!(out, "Date: {} | BTC Price: {:.2} USD", date, price)?;
        writeln!(out, "{}", format_panel(&sim.system))?;

        let delta = sim.rebalance()?;
        if delta == 0.0 {
            writeln!(out, "No change in DoC supply.")?;
        } else if delta > 0.0 {
            writeln!(out, "Minted {:.2} DoC adding {:.4} BTC", delta, delta / price)?;
        } else {
            writeln!(out, "Redeemed {:.2} DoC withdrawing {:.4} BTC", -delta, -delta / price)?;
        }
        writeln!(out, "{}", format_panel(&sim.system))?;
    }

    Ok(())
}
