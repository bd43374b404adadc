//! Historical Drivers
//!
//! Two ways of replaying a price history through the engine:
//!
//! - **Rolling**: each price point updates a bounded rolling mean (26 points,
//!   about 180 days of weekly data) used as `price_ma180`, then rebalances
//!   supply through free circulation.
//! - **Deposit**: each calendar day runs the full day step against a
//!   precomputed MA table and the market funding rates.

use std::collections::VecDeque;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::data::{FundingRateTable, MovingAverageTable, PricePoint};
use crate::error::SimResult;
use crate::rebalance::{rebalance_via_circulation, DEFAULT_TARGET_RATIO};
use crate::report::ReportRow;
use crate::state::StableSystem;
use crate::step::{step_one_day, DayOutcome};

/// Roughly 180 days of weekly samples.
pub const ROLLING_WINDOW: usize = 26;

/// Mean over the last `window` values.
#[derive(Debug, Clone)]
pub struct RollingAverage {
    window: usize,
    values: VecDeque<f64>,
}

impl RollingAverage {
    pub fn new(window: usize, seed: f64) -> Self {
        let mut values = VecDeque::with_capacity(window + 1);
        values.push_back(seed);
        Self {
            window: window.max(1),
            values,
        }
    }

    pub fn push(&mut self, value: f64) -> f64 {
        self.values.push_back(value);
        if self.values.len() > self.window {
            self.values.pop_front();
        }
        self.mean()
    }

    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollingStep {
    pub date: String,
    pub price: f64,
    pub doc_supply: f64,
    pub btc_collateral: f64,
    pub doc_available: f64,
    pub target_coverage: f64,
    pub real_coverage: f64,
    pub change_doc: f64,
}

/// Rolling-average replay, advanced one price point at a time.
pub struct RollingSimulation {
    pub system: StableSystem,
    average: RollingAverage,
    target_ratio: f64,
}

impl RollingSimulation {
    pub fn new(system: StableSystem) -> Self {
        let average = RollingAverage::new(ROLLING_WINDOW, system.price_ma180);
        Self {
            system,
            average,
            target_ratio: DEFAULT_TARGET_RATIO,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.average = RollingAverage::new(window, self.system.price_ma180);
        self
    }

    /// Take in the next price and roll the average; no supply change yet.
    pub fn observe(&mut self, price: f64) {
        self.system.set_price(price);
        self.system.price_ma180 = self.average.push(price);
    }

    /// Rebalance at the current target coverage.
    pub fn rebalance(&mut self) -> SimResult<f64> {
        let tcov = self.system.target_coverage();
        rebalance_via_circulation(&mut self.system, tcov, self.target_ratio)
    }

    pub fn step(&mut self, date: &str, price: f64) -> SimResult<RollingStep> {
        self.observe(price);
        let change_doc = self.rebalance()?;

        Ok(RollingStep {
            date: date.to_string(),
            price,
            doc_supply: self.system.doc_supply,
            btc_collateral: self.system.btc_collateral,
            doc_available: self.system.doc_available_to_mint(),
            target_coverage: self.system.target_coverage(),
            real_coverage: self.system.real_coverage(),
            change_doc,
        })
    }

    pub fn report_row(&self) -> ReportRow {
        ReportRow::from_system(&self.system)
    }
}

/// Replay `prices` with the rolling driver, returning the step log and the
/// report row after each point.
pub fn run_rolling(
    system: StableSystem,
    prices: &[PricePoint],
) -> SimResult<(StableSystem, Vec<RollingStep>, Vec<ReportRow>)> {
    info!(points = prices.len(), "starting rolling replay");
    let mut sim = RollingSimulation::new(system);
    let mut steps = Vec::with_capacity(prices.len());
    let mut rows = Vec::with_capacity(prices.len());

    for (date, price) in prices {
        steps.push(sim.step(date, *price)?);
        rows.push(sim.report_row());
    }

    info!(doc_supply = sim.system.doc_supply, "rolling replay finished");
    Ok((sim.system, steps, rows))
}

#[derive(Debug, Clone)]
pub struct DepositRun {
    pub system: StableSystem,
    pub days: Vec<DayOutcome>,
    pub rows: Vec<ReportRow>,
}

/// Replay daily closes through the full day step.
pub fn run_with_deposit(
    mut system: StableSystem,
    daily_prices: &[(NaiveDate, f64)],
    ma_table: &MovingAverageTable,
    funding: &FundingRateTable,
) -> DepositRun {
    info!(
        days = daily_prices.len(),
        ma_rows = ma_table.len(),
        funding_rows = funding.len(),
        "starting deposit replay"
    );
    if funding.is_empty() {
        warn!("no funding rates loaded, market rate is 0 every day");
    }
    let mut days = Vec::with_capacity(daily_prices.len());
    let mut rows = Vec::with_capacity(daily_prices.len());

    for (date, price) in daily_prices {
        let rate = funding.rate_on(*date);
        days.push(step_one_day(&mut system, *date, *price, ma_table, rate));
        rows.push(ReportRow::from_system(&system));
    }

    info!(
        vault_docs = system.vault_docs,
        doc_supply = system.doc_supply,
        btc_collateral = system.btc_collateral,
        "deposit replay finished"
    );
    DepositRun { system, days, rows }
}
