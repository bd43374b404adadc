//! CSV loaders for price series and date-indexed tables.
//!
//! - Price series: `date,price` or `Time,BTC` headers (case-insensitive)
//! - Moving averages: `date,ma180`
//! - Funding rates: `date,funding_rate_daily`

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{SimError, SimResult};

/// Weekly sampling keeps one row in this many.
pub const WEEKLY_STRIDE: usize = 7;

/// One `(date, price)` row as read from the file.
pub type PricePoint = (String, f64);

fn normalize_header(h: &str) -> String {
    h.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Index of the first header matching any of `names`, in preference order.
fn find_column(headers: &csv::StringRecord, names: &[&str]) -> SimResult<usize> {
    let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
    names
        .iter()
        .find_map(|name| normalized.iter().position(|h| h == name))
        .ok_or_else(|| SimError::MissingColumn(names.join("|")))
}

fn parse_number(column: &str, value: &str) -> SimResult<f64> {
    value.trim().parse::<f64>().map_err(|_| SimError::InvalidNumber {
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// Parse a date or timestamp, flooring timestamps to their calendar day.
pub fn parse_date(value: &str) -> SimResult<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .ok_or_else(|| SimError::InvalidDate(value.to_string()))
}

pub fn read_price_data<R: Read>(reader: R, weekly: bool) -> SimResult<Vec<PricePoint>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let date_idx = find_column(&headers, &["date", "time"])?;
    let price_idx = find_column(&headers, &["price", "btc"])?;

    let mut data = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        if weekly && idx % WEEKLY_STRIDE != 0 {
            continue;
        }
        let record = record?;
        let date = record.get(date_idx).unwrap_or_default().to_string();
        let price = parse_number("price", record.get(price_idx).unwrap_or_default())?;
        data.push((date, price));
    }
    debug!(rows = data.len(), weekly, "price data loaded");
    Ok(data)
}

pub fn load_price_data(path: impl AsRef<Path>, weekly: bool) -> SimResult<Vec<PricePoint>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_price_data(file, weekly)
}

/// Last price of each calendar day, in date order.
pub fn daily_closes(points: &[PricePoint]) -> SimResult<Vec<(NaiveDate, f64)>> {
    let mut by_day = BTreeMap::new();
    for (date, price) in points {
        by_day.insert(parse_date(date)?, *price);
    }
    Ok(by_day.into_iter().collect())
}

fn read_dated_column<R: Read>(reader: R, value_column: &str) -> SimResult<BTreeMap<NaiveDate, f64>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let date_idx = find_column(&headers, &["date"])?;
    let value_idx = find_column(&headers, &[value_column])?;

    let mut entries = BTreeMap::new();
    for record in rdr.records() {
        let record = record?;
        let date = parse_date(record.get(date_idx).unwrap_or_default())?;
        let value = parse_number(value_column, record.get(value_idx).unwrap_or_default())?;
        entries.insert(date, value);
    }
    Ok(entries)
}

/// Historical 180-day moving average indexed by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovingAverageTable {
    entries: BTreeMap<NaiveDate, f64>,
}

impl MovingAverageTable {
    pub fn from_entries(entries: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> SimResult<Self> {
        Ok(Self {
            entries: read_dated_column(reader, "ma180")?,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        Self::from_reader(std::fs::File::open(path.as_ref())?)
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.entries.get(&date).copied()
    }

    /// Value at the latest date on or before `date`.
    pub fn as_of(&self, date: NaiveDate) -> Option<f64> {
        self.entries.range(..=date).next_back().map(|(_, v)| *v)
    }

    pub fn earliest(&self) -> Option<f64> {
        self.entries.values().next().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.entries.iter().map(|(d, v)| (*d, *v))
    }
}

/// Daily market funding rate indexed by date; absent dates read as 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FundingRateTable {
    entries: BTreeMap<NaiveDate, f64>,
}

impl FundingRateTable {
    pub fn from_entries(entries: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> SimResult<Self> {
        Ok(Self {
            entries: read_dated_column(reader, "funding_rate_daily")?,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        Self::from_reader(std::fs::File::open(path.as_ref())?)
    }

    pub fn rate_on(&self, date: NaiveDate) -> f64 {
        self.entries.get(&date).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
