//! Day-Step Orchestrator
//!
//! One simulated day, in order:
//! 1. Set the day's price (updates the EMA)
//! 2. Rebalance DoC supply toward target coverage through the vault
//! 3. Mint the user share of the remaining headroom
//! 4. Accrue interest against the market funding rate
//! 5. Carry today's MA forward as the next day's reference

use chrono::NaiveDate;
use tracing::debug;

use crate::data::MovingAverageTable;
use crate::interest::{accrue_interest, InterestOutcome};
use crate::rebalance::{rebalance_via_vault, DEFAULT_TARGET_RATIO, REBALANCE_EPSILON};
use crate::state::StableSystem;

#[derive(Debug, Clone, PartialEq)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub price: f64,
    pub target_coverage: f64,
    pub rebalance_delta: f64,
    /// Headroom share allocated to users and minted this day.
    pub user_docs: f64,
    pub interest: InterestOutcome,
}

/// Split `available` headroom into (protocol, user) shares by the ratio of
/// available to available-plus-emitted.
pub fn split_emission(available: f64, emitted: f64) -> (f64, f64) {
    let total = emitted + available;
    let percent = if total > 0.0 { available / total } else { 0.0 };
    let protocol = available * percent;
    (protocol, available - protocol)
}

pub fn step_one_day(
    system: &mut StableSystem,
    date: NaiveDate,
    price: f64,
    ma_table: &MovingAverageTable,
    funding_rate_market: f64,
) -> DayOutcome {
    system.set_price(price);
    let tcov = system.target_coverage();
    let rebalance_delta = rebalance_via_vault(system, tcov, DEFAULT_TARGET_RATIO);

    let (_protocol_docs, user_docs) =
        split_emission(system.doc_available_to_mint(), system.doc_supply);
    let user_docs = if user_docs > REBALANCE_EPSILON && system.price > 0.0 {
        system.mint_doc(user_docs / system.price);
        // Users receive the new DoC, and the vault ledger is credited too.
        system.vault_docs += user_docs;
        user_docs
    } else {
        0.0
    };

    let interest = accrue_interest(system, date, ma_table, funding_rate_market);
    system.price_ma180 = interest.ma_current;
    system.time += 1;

    debug!(%date, price, rebalance_delta, user_docs, "day stepped");

    DayOutcome {
        date,
        price,
        target_coverage: tcov,
        rebalance_delta,
        user_docs,
        interest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_split_emission() {
        assert_eq!(split_emission(0.0, 0.0), (0.0, 0.0));
        let (protocol, user) = split_emission(100.0, 300.0);
        assert!((protocol - 25.0).abs() < 1e-12);
        assert!((user - 75.0).abs() < 1e-12);
    }

    #[test]
    fn test_day_carries_ma_forward() {
        let mut system = StableSystem::new(100.0, 50.0, 0.0, 25000.0, 2.0, 25000.0);
        let table = MovingAverageTable::from_entries(vec![(date("2021-01-01"), 24000.0)]);

        let outcome = step_one_day(&mut system, date("2021-01-01"), 26000.0, &table, 0.0);

        assert_eq!(system.price, 26000.0);
        assert_eq!(system.price_ma180, 24000.0);
        assert_eq!(outcome.interest.ma_current, 24000.0);
        assert_eq!(outcome.interest.rate_max, 0.0);
        assert_eq!(system.time, 1);
    }

    #[test]
    fn test_day_rebalances_then_mints_user_share() {
        let mut system = StableSystem::new(100.0, 50.0, 0.0, 25000.0, 2.0, 25000.0);
        let table = MovingAverageTable::from_entries(vec![(date("2021-01-01"), 25000.0)]);

        let outcome = step_one_day(&mut system, date("2021-01-01"), 25000.0, &table, 0.0);

        let expected_delta = (100.0 * 25000.0 / 2.0) / 1.1 - 50.0;
        assert!((outcome.rebalance_delta - expected_delta).abs() < 1e-6);
        assert_eq!(outcome.target_coverage, 2.0);
        // The vault mint spent collateral, so no headroom is left for users.
        assert_eq!(outcome.user_docs, 0.0);
        assert!((system.vault_docs - expected_delta).abs() < 1e-6);
    }

    #[test]
    fn test_day_contraction_frees_user_headroom() {
        let mut system = StableSystem::new(100.0, 2_000_000.0, 0.0, 25000.0, 2.0, 25000.0);
        system.vault_docs = 2_000_000.0;
        let table = MovingAverageTable::from_entries(vec![(date("2021-01-01"), 25000.0)]);

        let outcome = step_one_day(&mut system, date("2021-01-01"), 25000.0, &table, 0.0);

        assert!(outcome.rebalance_delta < 0.0);
        assert!(outcome.user_docs > 0.0);
        // Vault keeps what was not redeemed plus the user share.
        let vault = 2_000_000.0 + outcome.rebalance_delta + outcome.user_docs;
        assert!((system.vault_docs - vault).abs() < 1e-6);
        assert_eq!(outcome.interest.vault_adjustment, 0.0);
    }

    #[test]
    fn test_supply_above_threshold_accrues_nothing() {
        let mut system = StableSystem::new(100.0, 50.0, 0.0, 25000.0, 2.0, 25000.0);
        let table = MovingAverageTable::from_entries(vec![
            (date("2016-01-01"), 1000.0),
            (date("2021-01-01"), 25000.0),
        ]);

        let outcome = step_one_day(&mut system, date("2021-01-01"), 25000.0, &table, 0.0);

        assert!(outcome.interest.rate_max > 0.0);
        assert_eq!(outcome.interest.applied_rate, 0.0);
        assert_eq!(outcome.interest.interest_docs, 0.0);
    }

    #[test]
    fn test_zero_price_day_is_safe() {
        let mut system = StableSystem::new(100.0, 50.0, 0.0, 25000.0, 2.0, 25000.0);
        let table = MovingAverageTable::from_entries(vec![(date("2021-01-01"), 25000.0)]);

        let outcome = step_one_day(&mut system, date("2021-01-01"), 0.0, &table, 0.0);

        assert_eq!(outcome.user_docs, 0.0);
        assert!(system.doc_supply.is_finite());
        assert!(system.btc_collateral.is_finite());
    }

    #[test]
    fn test_zero_price_without_average_mints_nothing() {
        let mut system = StableSystem::new(100.0, 50.0, 0.0, 25000.0, 2.0, 0.0);
        let table = MovingAverageTable::from_entries(vec![(date("2021-01-01"), 25000.0)]);

        let outcome = step_one_day(&mut system, date("2021-01-01"), 0.0, &table, -0.01);

        assert_eq!(outcome.target_coverage, 0.0);
        assert_eq!(outcome.rebalance_delta, 0.0);
        assert!(outcome.interest.delta_rate > 0.0);
        assert_eq!(outcome.interest.vault_adjustment, 0.0);
        assert_eq!(system.doc_supply, 50.0);
        assert_eq!(system.vault_docs, 0.0);
    }
}
