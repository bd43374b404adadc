//! Protocol State and Accounting
//!
//! `StableSystem` is the single mutable aggregate of the simulation: BTC
//! collateral backing two tokens, DoC (stable) and BPro (leveraged), plus a
//! vault sub-ledger of DoC that accrues interest.
//!
//! ## Formulas
//! - Real coverage: `btc_collateral * price / doc_supply`
//! - Target coverage: `1 + (price / price_ma180) * (param_coverage - 1)`
//! - Leverage: `rcov / (rcov - 1)`
//! - BPro price: `(btc_collateral * price - doc_supply) / bpro_supply`
//!
//! Degenerate inputs (zero price, zero average, zero supply) resolve to
//! fixed sentinel values instead of errors. Only redeeming more than the
//! outstanding supply fails.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use tracing::{debug, warn};

use crate::error::{SimError, SimResult, Token};

pub const DEFAULT_BTC_COLLATERAL: f64 = 100.0;
pub const DEFAULT_DOC_SUPPLY: f64 = 50.0;
pub const DEFAULT_PRICE: f64 = 25000.0;
pub const DEFAULT_PARAM_COVERAGE: f64 = 2.0;
pub const DEFAULT_EMA_ALPHA: f64 = 0.1;
pub const DEFAULT_DOC_THRESHOLD: f64 = 90.0;

/// Max fractional price move per `advance_time` step.
const RANDOM_WALK_STEP: f64 = 0.05;

/// Result of a DoC mint or redeem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub doc: f64,
    pub btc: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StableSystem {
    pub btc_collateral: f64,
    pub doc_supply: f64,
    pub bpro_supply: f64,
    /// DoC held in the interest-bearing deposit bucket.
    pub vault_docs: f64,
    pub price: f64,
    pub price_ma180: f64,
    pub price_ema: f64,
    pub ema_alpha: f64,
    pub param_coverage: f64,
    /// Interest accrues only while `doc_supply` is below this.
    pub doc_threshold: f64,
    pub time: u64,
}

impl Default for StableSystem {
    fn default() -> Self {
        Self {
            btc_collateral: DEFAULT_BTC_COLLATERAL,
            doc_supply: DEFAULT_DOC_SUPPLY,
            bpro_supply: 0.0,
            vault_docs: 0.0,
            price: DEFAULT_PRICE,
            price_ma180: DEFAULT_PRICE,
            price_ema: DEFAULT_PRICE,
            ema_alpha: DEFAULT_EMA_ALPHA,
            param_coverage: DEFAULT_PARAM_COVERAGE,
            doc_threshold: DEFAULT_DOC_THRESHOLD,
            time: 0,
        }
    }
}

impl StableSystem {
    /// Build a system at `price`, seeding the EMA from it.
    pub fn new(
        btc_collateral: f64,
        doc_supply: f64,
        bpro_supply: f64,
        price: f64,
        param_coverage: f64,
        price_ma180: f64,
    ) -> Self {
        Self {
            btc_collateral,
            doc_supply,
            bpro_supply,
            price,
            price_ema: price,
            param_coverage,
            price_ma180,
            ..Default::default()
        }
    }

    /// BTC equivalent of `doc_amount` at the current price, 0 when price is 0.
    fn btc_for_docs(&self, doc_amount: f64) -> f64 {
        if self.price == 0.0 {
            return 0.0;
        }
        doc_amount / self.price
    }

    fn update_ema(&mut self) {
        self.price_ema = self.ema_alpha * self.price + (1.0 - self.ema_alpha) * self.price_ema;
    }

    fn check_vault(&self) {
        if self.vault_docs < 0.0 || self.vault_docs > self.doc_supply {
            warn!(
                vault_docs = self.vault_docs,
                doc_supply = self.doc_supply,
                "vault ledger outside [0, doc_supply]"
            );
        }
    }

    // ---------------------------------------------------------------------
    // Valuation
    // ---------------------------------------------------------------------

    pub fn collateral_value(&self) -> f64 {
        self.btc_collateral * self.price
    }

    /// Target coverage without a minimum cap; callers handle values below 1.
    pub fn target_coverage(&self) -> f64 {
        if self.price_ma180 == 0.0 {
            return 0.0;
        }
        1.0 + (self.price / self.price_ma180) * (self.param_coverage - 1.0)
    }

    pub fn real_coverage(&self) -> f64 {
        if self.doc_supply == 0.0 {
            return f64::INFINITY;
        }
        self.collateral_value() / self.doc_supply
    }

    pub fn leverage(&self) -> f64 {
        let rcov = self.real_coverage();
        if rcov.is_infinite() {
            return 1.0;
        }
        if rcov <= 1.0 {
            return 0.0;
        }
        rcov / (rcov - 1.0)
    }

    /// BPro price in fiat. Negative when collateral is worth less than the DoC
    /// liabilities.
    pub fn bpro_price(&self) -> f64 {
        if self.bpro_supply == 0.0 {
            return 0.0;
        }
        (self.collateral_value() - self.doc_supply) / self.bpro_supply
    }

    pub fn bpro_price_btc(&self) -> f64 {
        if self.price == 0.0 {
            return 0.0;
        }
        self.bpro_price() / self.price
    }

    pub fn bpro_value_btc(&self) -> f64 {
        self.bpro_price_btc() * self.bpro_supply
    }

    /// DoC that could still be minted while keeping target coverage.
    pub fn doc_available_to_mint(&self) -> f64 {
        let tcov = self.target_coverage();
        if tcov == 0.0 {
            return 0.0;
        }
        let max_doc = self.collateral_value() / tcov;
        (max_doc - self.doc_supply).max(0.0)
    }

    // ---------------------------------------------------------------------
    // Price
    // ---------------------------------------------------------------------

    pub fn set_price(&mut self, new_price: f64) {
        self.price = new_price;
        self.update_ema();
        debug!(price = self.price, ema = self.price_ema, "price set");
    }

    /// Random-walk the price `steps` times, each move uniform in +/-5%.
    pub fn advance_time(&mut self, steps: u64, rng: &mut impl Rng) {
        let step = Uniform::new_inclusive(-RANDOM_WALK_STEP, RANDOM_WALK_STEP);
        for _ in 0..steps {
            let variation = step.sample(rng) * self.price;
            self.price += variation;
            self.update_ema();
            self.time += 1;
        }
        debug!(steps, price = self.price, time = self.time, "time advanced");
    }

    // ---------------------------------------------------------------------
    // Mint / redeem
    // ---------------------------------------------------------------------

    pub fn mint_doc(&mut self, btc_amount: f64) -> Conversion {
        let doc = btc_amount * self.price;
        self.btc_collateral += btc_amount;
        self.doc_supply += doc;
        debug!(btc = btc_amount, doc, price = self.price, "minted DoC");
        Conversion {
            doc,
            btc: btc_amount,
            price: self.price,
        }
    }

    /// Mint exactly `doc_amount` DoC, adding the BTC it is worth.
    pub fn mint_doc_amount(&mut self, doc_amount: f64) -> Conversion {
        let btc = self.btc_for_docs(doc_amount);
        self.btc_collateral += btc;
        self.doc_supply += doc_amount;
        debug!(btc, doc = doc_amount, price = self.price, "minted DoC amount");
        Conversion {
            doc: doc_amount,
            btc,
            price: self.price,
        }
    }

    pub fn redeem_doc(&mut self, doc_amount: f64) -> SimResult<Conversion> {
        if doc_amount > self.doc_supply {
            return Err(SimError::InsufficientSupply {
                token: Token::Doc,
                requested: doc_amount,
                available: self.doc_supply,
            });
        }
        let btc = self.btc_for_docs(doc_amount);
        self.doc_supply -= doc_amount;
        self.btc_collateral -= btc;
        debug!(btc, doc = doc_amount, price = self.price, "redeemed DoC");
        Ok(Conversion {
            doc: doc_amount,
            btc,
            price: self.price,
        })
    }

    /// BPro is minted 1:1 against BTC.
    pub fn mint_bpro(&mut self, btc_amount: f64) -> f64 {
        self.btc_collateral += btc_amount;
        self.bpro_supply += btc_amount;
        debug!(btc = btc_amount, "minted BPro");
        btc_amount
    }

    pub fn redeem_bpro(&mut self, bpro_amount: f64) -> SimResult<f64> {
        if bpro_amount > self.bpro_supply {
            return Err(SimError::InsufficientSupply {
                token: Token::BPro,
                requested: bpro_amount,
                available: self.bpro_supply,
            });
        }
        self.bpro_supply -= bpro_amount;
        self.btc_collateral -= bpro_amount;
        debug!(btc = bpro_amount, "redeemed BPro");
        Ok(bpro_amount)
    }

    // ---------------------------------------------------------------------
    // Vault bucket
    // ---------------------------------------------------------------------

    /// Convert collateral into new DoC deposited in the vault. Capped at the
    /// collateral on hand. Returns the DoC actually minted.
    pub fn mint_docs_for_deposit(&mut self, quantity: f64) -> f64 {
        let mut quantity = quantity;
        // No finite amount of BTC buys DoC at a zero price.
        let mut btc_needed = if self.price == 0.0 && quantity > 0.0 {
            f64::INFINITY
        } else {
            self.btc_for_docs(quantity)
        };
        if btc_needed > self.btc_collateral {
            quantity = self.btc_collateral * self.price;
            btc_needed = self.btc_collateral;
        }
        self.btc_collateral -= btc_needed;
        self.doc_supply += quantity;
        self.vault_docs += quantity;
        debug!(doc = quantity, btc = btc_needed, "vault deposit minted");
        self.check_vault();
        quantity
    }

    /// Remove DoC from the vault and return its BTC to collateral. Not
    /// bounded by the vault balance.
    pub fn redeem_docs_from_deposit(&mut self, quantity: f64) -> f64 {
        let btc_returned = self.btc_for_docs(quantity);
        self.vault_docs -= quantity;
        self.doc_supply -= quantity;
        self.btc_collateral += btc_returned;
        debug!(doc = quantity, btc = btc_returned, "vault deposit redeemed");
        self.check_vault();
        btc_returned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scenario() -> StableSystem {
        StableSystem::new(100.0, 50.0, 0.0, 25000.0, 2.0, 25000.0)
    }

    #[test]
    fn test_zero_doc_supply_is_infinite_coverage() {
        let mut system = scenario();
        system.doc_supply = 0.0;

        assert!(system.real_coverage().is_infinite());
        assert_eq!(system.leverage(), 1.0);
    }

    #[test]
    fn test_leverage_cases() {
        let mut system = scenario();
        // rcov = 100 * 25000 / 50 = 50000
        let rcov = system.real_coverage();
        assert!((system.leverage() - rcov / (rcov - 1.0)).abs() < 1e-12);

        system.doc_supply = system.collateral_value();
        assert_eq!(system.leverage(), 0.0);

        system.doc_supply *= 2.0;
        assert_eq!(system.leverage(), 0.0);
    }

    #[test]
    fn test_bpro_price_without_supply() {
        let system = scenario();
        assert_eq!(system.bpro_price(), 0.0);
        assert_eq!(system.bpro_price_btc(), 0.0);
    }

    #[test]
    fn test_bpro_price_can_go_negative() {
        let mut system = StableSystem::new(1.0, 30000.0, 1.0, 25000.0, 2.0, 25000.0);
        assert!((system.bpro_price() - (-5000.0)).abs() < 1e-9);
        assert!((system.bpro_price_btc() - (-0.2)).abs() < 1e-12);

        system.set_price(0.0);
        assert_eq!(system.bpro_price_btc(), 0.0);
    }

    #[test]
    fn test_target_coverage_at_average_equals_parameter() {
        for param in [1.5, 2.0, 3.7, 10.0] {
            let mut system = scenario();
            system.param_coverage = param;
            assert_eq!(system.target_coverage(), param);
        }
    }

    #[test]
    fn test_target_coverage_zero_average() {
        let mut system = scenario();
        system.price_ma180 = 0.0;
        assert_eq!(system.target_coverage(), 0.0);
        assert_eq!(system.doc_available_to_mint(), 0.0);
    }

    #[test]
    fn test_doc_available_to_mint() {
        let system = scenario();
        // (100 * 25000) / 2 - 50
        assert!((system.doc_available_to_mint() - 1_249_950.0).abs() < 1e-6);

        let mut crowded = scenario();
        crowded.doc_supply = 5_000_000.0;
        assert_eq!(crowded.doc_available_to_mint(), 0.0);
    }

    #[test]
    fn test_mint_then_redeem_doc_scenario() {
        let mut system = scenario();

        let minted = system.mint_doc(0.2);
        assert!((minted.doc - 5000.0).abs() < 1e-9);
        assert!((system.doc_supply - 5050.0).abs() < 1e-9);
        assert!((system.btc_collateral - 100.2).abs() < 1e-9);

        system.redeem_doc(100.0).unwrap();
        assert!((system.doc_supply - 4950.0).abs() < 1e-9);
        assert!((system.btc_collateral - 100.196).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_depends_on_price() {
        let mut system = scenario();
        let before = system.clone();

        let minted = system.mint_doc(0.5);
        system.redeem_doc(minted.doc).unwrap();
        assert!((system.doc_supply - before.doc_supply).abs() < 1e-9);
        assert!((system.btc_collateral - before.btc_collateral).abs() < 1e-9);

        let minted = system.mint_doc(0.5);
        system.set_price(50000.0);
        system.redeem_doc(minted.doc).unwrap();
        assert!((system.doc_supply - before.doc_supply).abs() < 1e-9);
        assert!((system.btc_collateral - (before.btc_collateral + 0.25)).abs() < 1e-9);
    }

    #[test]
    fn test_redeem_doc_over_supply_fails() {
        let mut system = scenario();
        let before = system.clone();

        let err = system.redeem_doc(50.01).unwrap_err();
        assert!(matches!(
            err,
            SimError::InsufficientSupply { token: Token::Doc, .. }
        ));
        assert!(err.is_recoverable());
        assert_eq!(system, before);
    }

    #[test]
    fn test_bpro_mint_and_redeem() {
        let mut system = scenario();
        system.mint_bpro(0.2);
        assert!((system.bpro_supply - 0.2).abs() < 1e-12);
        assert!((system.btc_collateral - 100.2).abs() < 1e-12);

        system.redeem_bpro(0.1).unwrap();
        assert!((system.bpro_supply - 0.1).abs() < 1e-12);
        assert!((system.btc_collateral - 100.1).abs() < 1e-12);

        let before = system.clone();
        assert!(system.redeem_bpro(1.0).is_err());
        assert_eq!(system, before);
    }

    #[test]
    fn test_mint_doc_amount() {
        let mut system = scenario();
        let conv = system.mint_doc_amount(2500.0);
        assert!((conv.btc - 0.1).abs() < 1e-12);
        assert!((system.btc_collateral - 100.1).abs() < 1e-9);
        assert!((system.doc_supply - 2550.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_price_updates_ema() {
        let mut system = scenario();
        system.set_price(30000.0);
        // 0.1 * 30000 + 0.9 * 25000
        assert!((system.price_ema - 25500.0).abs() < 1e-9);
        assert_eq!(system.price, 30000.0);
    }

    #[test]
    fn test_advance_time_bounded_walk() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut system = scenario();

        for _ in 0..50 {
            let before = system.price;
            system.advance_time(1, &mut rng);
            assert!(system.price >= before * 0.95 - 1e-9);
            assert!(system.price <= before * 1.05 + 1e-9);
        }
        assert_eq!(system.time, 50);
    }

    #[test]
    fn test_advance_time_is_reproducible_with_seed() {
        let mut a = scenario();
        let mut b = scenario();
        a.advance_time(10, &mut StdRng::seed_from_u64(42));
        b.advance_time(10, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_deposit_mint_consumes_collateral() {
        let mut system = scenario();
        let minted = system.mint_docs_for_deposit(2500.0);

        assert_eq!(minted, 2500.0);
        assert!((system.btc_collateral - 99.9).abs() < 1e-9);
        assert!((system.doc_supply - 2550.0).abs() < 1e-9);
        assert!((system.vault_docs - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_deposit_mint_is_capped_by_collateral() {
        let mut system = StableSystem::new(1.0, 0.0, 0.0, 25000.0, 2.0, 25000.0);
        let minted = system.mint_docs_for_deposit(1_000_000.0);

        assert_eq!(minted, 25000.0);
        assert_eq!(system.btc_collateral, 0.0);
        assert_eq!(system.vault_docs, 25000.0);
    }

    #[test]
    fn test_deposit_mint_at_zero_price_mints_nothing() {
        let mut system = StableSystem::default();
        system.set_price(0.0);
        let minted = system.mint_docs_for_deposit(1000.0);

        assert_eq!(minted, 0.0);
        assert_eq!(system.doc_supply, 50.0);
        assert_eq!(system.vault_docs, 0.0);
        // The cap branch hands over the whole collateral for zero DoC.
        assert_eq!(system.btc_collateral, 0.0);
    }

    #[test]
    fn test_deposit_redeem_is_unguarded() {
        let mut system = scenario();
        let btc = system.redeem_docs_from_deposit(25.0);

        assert!((btc - 0.001).abs() < 1e-12);
        assert_eq!(system.vault_docs, -25.0);
        assert!((system.doc_supply - 25.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_redeem_beyond_supply_never_mutates(
            supply in 0.0f64..1e6,
            excess in 1e-6f64..1e6,
        ) {
            let mut system = scenario();
            system.doc_supply = supply;
            let before = system.clone();

            prop_assert!(system.redeem_doc(supply + excess).is_err());
            prop_assert_eq!(system, before);
        }

        #[test]
        fn prop_target_coverage_matches_param_at_average(
            price in 1.0f64..1e6,
            param in 1.0f64..20.0,
        ) {
            let mut system = scenario();
            system.price = price;
            system.price_ma180 = price;
            system.param_coverage = param;
            prop_assert_eq!(system.target_coverage(), param);
        }
    }
}
