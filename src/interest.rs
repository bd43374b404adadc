//! Interest-Rate Engine
//!
//! Derives a daily DoC rate from how much the 180-day average grew over the
//! last four years, damped to a quarter of the implied compounding rate.
//! The rate only applies while DoC supply is under the threshold and is
//! reconciled against the market funding rate through the vault.

use chrono::{Duration, NaiveDate};
use tracing::{debug, warn};

use crate::data::MovingAverageTable;
use crate::state::StableSystem;

pub const LOOKBACK_DAYS: i64 = 4 * 365;

/// The applied rate is this fraction of the implied daily growth.
pub const RATE_DAMPING: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InterestOutcome {
    pub ma_current: f64,
    pub ma_past: f64,
    pub rate_max: f64,
    pub applied_rate: f64,
    pub delta_rate: f64,
    /// DoC minted into (+) or withdrawn from (-) the vault by the rate delta.
    pub vault_adjustment: f64,
    pub interest_docs: f64,
}

/// MA at the latest date on or before `current_date - 4 years`, falling back
/// to the earliest entry.
pub fn ma180_four_years_ago(table: &MovingAverageTable, current_date: NaiveDate) -> f64 {
    let target = current_date - Duration::days(LOOKBACK_DAYS);
    match table.as_of(target) {
        Some(ma) => ma,
        None => {
            debug!(%target, "no MA before lookback date, using earliest");
            table.earliest().unwrap_or(0.0)
        }
    }
}

/// MA on `current_date`. A missing day falls back to the latest earlier
/// entry, then the earliest one.
pub fn ma180_on(table: &MovingAverageTable, current_date: NaiveDate) -> f64 {
    if let Some(ma) = table.get(current_date) {
        return ma;
    }
    warn!(%current_date, "no MA for date, using nearest earlier entry");
    table
        .as_of(current_date)
        .or_else(|| table.earliest())
        .unwrap_or(0.0)
}

/// Maximum daily rate implied by `ma_current / ma_past` over four years.
pub fn compute_daily_doc_rate(ma_current: f64, ma_past: f64) -> f64 {
    if ma_past <= 0.0 {
        return 0.0;
    }
    let total_factor = ma_current / ma_past;
    if total_factor <= 0.0 {
        return 0.0;
    }
    let daily_growth = total_factor.powf(1.0 / LOOKBACK_DAYS as f64) - 1.0;
    daily_growth / RATE_DAMPING
}

/// Interest is switched off once supply reaches the threshold.
pub fn apply_threshold(rate_max: f64, doc_supply: f64, doc_threshold: f64) -> f64 {
    if doc_supply < doc_threshold {
        rate_max
    } else {
        0.0
    }
}

/// Run the rate comparison and daily interest payment against the vault.
pub fn accrue_interest(
    system: &mut StableSystem,
    current_date: NaiveDate,
    table: &MovingAverageTable,
    funding_rate_market: f64,
) -> InterestOutcome {
    let ma_current = ma180_on(table, current_date);
    let ma_past = ma180_four_years_ago(table, current_date);

    let rate_max = compute_daily_doc_rate(ma_current, ma_past);
    let applied_rate = apply_threshold(rate_max, system.doc_supply, system.doc_threshold);

    let delta_rate = applied_rate - funding_rate_market;
    let mut vault_adjustment = 0.0;
    if delta_rate > 0.0 {
        vault_adjustment = system.mint_docs_for_deposit(delta_rate * system.doc_supply);
    } else if delta_rate < 0.0 && system.vault_docs > 0.0 {
        let withdraw = system.vault_docs.min(delta_rate.abs() * system.vault_docs);
        system.redeem_docs_from_deposit(withdraw);
        vault_adjustment = -withdraw;
    }

    let mut interest_docs = applied_rate * system.doc_supply;
    if interest_docs > 0.0 {
        interest_docs = system.mint_docs_for_deposit(interest_docs);
    }

    debug!(
        %current_date,
        rate_max,
        applied_rate,
        delta_rate,
        vault_adjustment,
        interest_docs,
        "interest accrued"
    );

    InterestOutcome {
        ma_current,
        ma_past,
        rate_max,
        applied_rate,
        delta_rate,
        vault_adjustment,
        interest_docs,
    }
}
