//! Interactive Shell Binary
//!
//! ## Usage
//! ```bash
//! cargo run --bin repl -- config.json
//! ```

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use moc_simulation::config::load_system_or_default;
use moc_simulation::logging::init_logging_from_env;
use moc_simulation::repl::run_repl;

#[derive(Parser)]
#[command(name = "repl")]
#[command(about = "Interactive Money on Chain simulation", long_about = None)]
struct Cli {
    /// Initial state; built-in defaults when the file is missing
    #[arg(default_value = "config.json")]
    config: PathBuf,
}

fn main() -> Result<()> {
    init_logging_from_env().map_err(|e| anyhow::anyhow!("logging init failed: {e}"))?;
    let cli = Cli::parse();

    let mut system = load_system_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    let mut rng = rand::thread_rng();

    run_repl(&mut system, io::stdin().lock(), io::stdout().lock(), &mut rng)?;
    Ok(())
}
