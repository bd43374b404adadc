//! 180-day moving-average precomputation.
//!
//! Daily closes in, `date,ma180` rows out. The first days average over
//! however many closes exist so far.

use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::{daily_closes, MovingAverageTable, PricePoint};
use crate::error::SimResult;

pub const MA_WINDOW_DAYS: usize = 180;

#[derive(Debug, Serialize)]
struct MaRow {
    date: String,
    ma180: f64,
}

/// Trailing mean over up to `window` closes.
pub fn rolling_mean(closes: &[(NaiveDate, f64)], window: usize) -> Vec<(NaiveDate, f64)> {
    let window = window.max(1);
    let mut buf = VecDeque::with_capacity(window);
    let mut sum = 0.0;
    let mut out = Vec::with_capacity(closes.len());

    for (date, price) in closes {
        buf.push_back(*price);
        sum += price;
        if buf.len() > window {
            if let Some(old) = buf.pop_front() {
                sum -= old;
            }
        }
        out.push((*date, sum / buf.len() as f64));
    }
    out
}

pub fn compute_ma180(points: &[PricePoint]) -> SimResult<MovingAverageTable> {
    let closes = daily_closes(points)?;
    Ok(MovingAverageTable::from_entries(rolling_mean(
        &closes,
        MA_WINDOW_DAYS,
    )))
}

pub fn write_ma_table_to<W: Write>(writer: W, table: &MovingAverageTable) -> SimResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (date, ma180) in table.iter() {
        wtr.serialize(MaRow {
            date: date.format("%Y-%m-%d").to_string(),
            ma180,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_ma_table(path: impl AsRef<Path>, table: &MovingAverageTable) -> SimResult<()> {
    write_ma_table_to(std::fs::File::create(path.as_ref())?, table)
}
