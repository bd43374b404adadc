//! Supply-Rebalancing Rule
//!
//! Moves DoC supply toward the coverage-implied target
//! `(btc_collateral * price / tcov) / (1 + ratio)`, leaving `ratio` of the
//! supply as minting headroom.

use tracing::debug;

use crate::error::SimResult;
use crate::state::StableSystem;

pub const DEFAULT_TARGET_RATIO: f64 = 0.1;

/// Deltas smaller than this are treated as already balanced.
pub const REBALANCE_EPSILON: f64 = 1e-9;

/// How new supply enters (and leaves) the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebalancePath {
    /// Mint into / redeem from the vault bucket, paid from collateral.
    Vault,
    /// Regular `mint_doc` / `redeem_doc` against free circulation.
    Circulation,
}

impl RebalancePath {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vault => "vault",
            Self::Circulation => "circulation",
        }
    }
}

pub fn target_supply(system: &StableSystem, tcov: f64, target_ratio: f64) -> f64 {
    if tcov == 0.0 {
        return 0.0;
    }
    (system.collateral_value() / tcov) / (1.0 + target_ratio)
}

/// Delta toward the target, or `None` when the rule should not act.
fn pending_delta(system: &StableSystem, tcov: f64, target_ratio: f64) -> Option<f64> {
    if tcov == 0.0 {
        return None;
    }
    let delta = target_supply(system, tcov, target_ratio) - system.doc_supply;
    if delta.abs() < REBALANCE_EPSILON {
        return None;
    }
    Some(delta)
}

/// Rebalance through the vault bucket. Returns the targeted delta (0 when
/// nothing was done).
pub fn rebalance_via_vault(system: &mut StableSystem, tcov: f64, target_ratio: f64) -> f64 {
    let Some(delta) = pending_delta(system, tcov, target_ratio) else {
        return 0.0;
    };
    if delta > 0.0 {
        system.mint_docs_for_deposit(delta);
    } else {
        system.redeem_docs_from_deposit(-delta);
    }
    debug!(delta, tcov, path = "vault", "supply rebalanced");
    delta
}

/// Rebalance through free circulation. Fails when the redeem would exceed
/// the outstanding supply.
pub fn rebalance_via_circulation(
    system: &mut StableSystem,
    tcov: f64,
    target_ratio: f64,
) -> SimResult<f64> {
    let Some(delta) = pending_delta(system, tcov, target_ratio) else {
        return Ok(0.0);
    };
    if delta > 0.0 {
        let btc_needed = if system.price == 0.0 {
            0.0
        } else {
            delta / system.price
        };
        system.mint_doc(btc_needed);
    } else {
        system.redeem_doc(-delta)?;
    }
    debug!(delta, tcov, path = "circulation", "supply rebalanced");
    Ok(delta)
}

/// Apply the rule once along `path`.
pub fn adjust_doc_supply(
    system: &mut StableSystem,
    tcov: f64,
    target_ratio: f64,
    path: RebalancePath,
) -> SimResult<f64> {
    match path {
        RebalancePath::Vault => Ok(rebalance_via_vault(system, tcov, target_ratio)),
        RebalancePath::Circulation => rebalance_via_circulation(system, tcov, target_ratio),
    }
}
