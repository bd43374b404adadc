//! Money on Chain Stablecoin Simulation Library
//!
//! Simulates a BTC-backed protocol issuing a stable token (DoC) and a
//! leveraged residual token (BPro), with an interest-bearing DoC vault driven
//! by long-horizon moving averages.
//!
//! ## Modules
//!
//! - `state`: protocol state, valuation formulas, mint/redeem
//! - `rebalance`: supply rebalancing toward target coverage
//! - `interest`: daily rate engine and vault reconciliation
//! - `step`: one simulated day
//! - `historical`: rolling and deposit replays of a price history
//! - `data`, `config`, `ma180`: loaders and the MA precomputation
//! - `report`, `repl`, `advice`: output, the command shell, coverage advice
//!
//! ## Usage
//!
//! ```bash
//! # Replay history with the vault deposit logic
//! cargo run --bin historical --release -- --config config.json
//!
//! # Export the per-point report
//! cargo run --bin export --release -- btcdata.csv config.json output.csv
//!
//! # Interactive shell
//! cargo run --bin repl
//! ```

pub mod advice;
pub mod config;
pub mod data;
pub mod error;
pub mod historical;
pub mod interest;
pub mod logging;
pub mod ma180;
pub mod rebalance;
pub mod repl;
pub mod report;
pub mod state;
pub mod step;

pub use error::{SimError, SimResult};
pub use state::StableSystem;
