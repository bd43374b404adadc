//! Scripted Walkthrough Binary
//!
//! Mints, redeems and random-walks the price from a config (or defaults),
//! printing the summary and collateral advice along the way.
//!
//! ## Usage
//! ```bash
//! cargo run --bin demo -- --seed 7
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use moc_simulation::advice::{rebalance_advice, DEFAULT_ADVICE_RATIO};
use moc_simulation::config::load_system_or_default;
use moc_simulation::logging::init_logging_from_env;
use moc_simulation::report::format_summary;
use moc_simulation::StableSystem;

#[derive(Parser)]
#[command(name = "demo")]
#[command(about = "Walk through the main protocol operations", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Seed for the price random walk
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
}

fn advise(system: &StableSystem) {
    println!("{}", rebalance_advice(system, DEFAULT_ADVICE_RATIO));
    println!();
}

fn main() -> Result<()> {
    init_logging_from_env().map_err(|e| anyhow::anyhow!("logging init failed: {e}"))?;
    let cli = Cli::parse();

    let mut system = load_system_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    let mut rng = StdRng::seed_from_u64(cli.seed);

    println!("=======================================================");
    println!("  Money on Chain Walkthrough");
    println!("=======================================================");
    println!();
    println!("{}", format_summary(&system));
    println!();

    system.advance_time(1, &mut rng);
    advise(&system);

    let minted = system.mint_doc(0.2);
    println!("Minted {:.2} DoC with {:.4} BTC", minted.doc, minted.btc);
    let bpro = system.mint_bpro(0.2);
    println!("Minted {:.4} BPro", bpro);
    system.advance_time(1, &mut rng);
    advise(&system);

    system.set_price(30000.0);
    match system.redeem_doc(100.0) {
        Ok(c) => println!("Redeemed {:.2} DoC for {:.4} BTC", c.doc, c.btc),
        Err(e) => println!("Error: {e}"),
    }
    match system.redeem_bpro(0.1) {
        Ok(btc) => println!("Redeemed {:.4} BPro", btc),
        Err(e) => println!("Error: {e}"),
    }
    system.advance_time(1, &mut rng);
    advise(&system);

    println!("{}", format_summary(&system));
    Ok(())
}
