//! Rebalance advice for a collateral ratio target.

use crate::state::StableSystem;

pub const DEFAULT_ADVICE_RATIO: f64 = 2.0;

/// Upper band is this multiple of the target ratio.
const EXCESS_BAND: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advice {
    /// Below target: roughly this much BTC is needed.
    AddCollateral { btc_needed: f64 },
    /// Above the band: this much BTC could be withdrawn or minted against.
    ExcessCollateral { btc_excess: f64 },
    WithinRange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebalanceAdvice {
    pub current_ratio: f64,
    pub advice: Advice,
}

impl std::fmt::Display for RebalanceAdvice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Current collateral ratio: {:.2}", self.current_ratio)?;
        match self.advice {
            Advice::AddCollateral { btc_needed } => write!(
                f,
                "Low collateralization, need ~{btc_needed:.4} BTC to reach target."
            ),
            Advice::ExcessCollateral { btc_excess } => write!(
                f,
                "High collateralization, ~{btc_excess:.4} BTC available to withdraw or mint more DoC."
            ),
            Advice::WithinRange => write!(f, "Collateralization within desired range."),
        }
    }
}

/// BTC needed to back current DoC at `target_ratio`; 0 at zero price.
fn btc_at_ratio(system: &StableSystem, target_ratio: f64) -> f64 {
    if system.price == 0.0 {
        return 0.0;
    }
    target_ratio * system.doc_supply / system.price
}

pub fn rebalance_advice(system: &StableSystem, target_ratio: f64) -> RebalanceAdvice {
    let current_ratio = system.real_coverage();
    let advice = if current_ratio < target_ratio {
        Advice::AddCollateral {
            btc_needed: btc_at_ratio(system, target_ratio) - system.btc_collateral,
        }
    } else if current_ratio > target_ratio * EXCESS_BAND {
        Advice::ExcessCollateral {
            btc_excess: system.btc_collateral - btc_at_ratio(system, target_ratio),
        }
    } else {
        Advice::WithinRange
    };
    RebalanceAdvice {
        current_ratio,
        advice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_collateral() {
        let system = StableSystem::new(1.0, 20000.0, 0.0, 25000.0, 2.0, 25000.0);
        let advice = rebalance_advice(&system, DEFAULT_ADVICE_RATIO);
        assert!((advice.current_ratio - 1.25).abs() < 1e-12);
        match advice.advice {
            Advice::AddCollateral { btc_needed } => assert!((btc_needed - 0.6).abs() < 1e-12),
            other => panic!("unexpected {other:?}"),
        }
        assert!(advice.to_string().contains("need ~0.6000 BTC"));
    }

    #[test]
    fn test_excess_collateral() {
        let system = StableSystem::default();
        let advice = rebalance_advice(&system, DEFAULT_ADVICE_RATIO);
        match advice.advice {
            Advice::ExcessCollateral { btc_excess } => {
                assert!((btc_excess - (100.0 - 2.0 * 50.0 / 25000.0)).abs() < 1e-12)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_within_band() {
        let system = StableSystem::new(2.1, 25000.0, 0.0, 25000.0, 2.0, 25000.0);
        let advice = rebalance_advice(&system, DEFAULT_ADVICE_RATIO);
        assert_eq!(advice.advice, Advice::WithinRange);
    }
}
