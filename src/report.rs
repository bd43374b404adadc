//! Reporting: per-day CSV rows and the text panel/summary views.
//!
//! Nothing here mutates state; every view is built from a `&StableSystem`.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::SimResult;
use crate::state::StableSystem;

/// One report line. Column names and order are consumed downstream and
/// must not change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "precio_btc")]
    pub price: f64,
    #[serde(rename = "media")]
    pub price_ma180: f64,
    #[serde(rename = "btc_en_el_protocolo")]
    pub btc_collateral: f64,
    #[serde(rename = "cantidad_bpros")]
    pub bpro_supply: f64,
    #[serde(rename = "doc_emitidos")]
    pub doc_supply: f64,
    #[serde(rename = "docs_disponibles_para_emitir")]
    pub doc_available: f64,
    #[serde(rename = "leverage")]
    pub leverage: f64,
    #[serde(rename = "cobertura_objetivo")]
    pub target_coverage: f64,
    #[serde(rename = "cobertura_real")]
    pub real_coverage: f64,
    #[serde(rename = "precio_bpro")]
    pub bpro_price: f64,
}

pub const REPORT_COLUMNS: [&str; 10] = [
    "precio_btc",
    "media",
    "btc_en_el_protocolo",
    "cantidad_bpros",
    "doc_emitidos",
    "docs_disponibles_para_emitir",
    "leverage",
    "cobertura_objetivo",
    "cobertura_real",
    "precio_bpro",
];

impl ReportRow {
    pub fn from_system(system: &StableSystem) -> Self {
        Self {
            price: system.price,
            price_ma180: system.price_ma180,
            btc_collateral: system.btc_collateral,
            bpro_supply: system.bpro_supply,
            doc_supply: system.doc_supply,
            doc_available: system.doc_available_to_mint(),
            leverage: system.leverage(),
            target_coverage: system.target_coverage(),
            real_coverage: system.real_coverage(),
            bpro_price: system.bpro_price(),
        }
    }
}

pub fn write_report_to<W: Write>(writer: W, rows: &[ReportRow]) -> SimResult<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(REPORT_COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_report(path: impl AsRef<Path>, rows: &[ReportRow]) -> SimResult<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_report_to(file, rows)
}

pub fn format_panel(system: &StableSystem) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== System Panel ===");
    let _ = writeln!(out, "BTC Collateral: {:.4} BTC", system.btc_collateral);
    let _ = writeln!(
        out,
        "BPro Supply: {:.4} BPro (Price {:.2} USD)",
        system.bpro_supply,
        system.bpro_price()
    );
    let _ = writeln!(out, "BPro Price BTC: {:.4} BTC/BPro", system.bpro_price_btc());
    let _ = writeln!(out, "DoC Supply: {:.2} DoC", system.doc_supply);
    let _ = writeln!(out, "DoC in Vault: {:.2} DoC", system.vault_docs);
    let _ = writeln!(out, "DoC Available to Mint: {:.2} DoC", system.doc_available_to_mint());
    let _ = writeln!(out, "Price EMA: {:.2} USD", system.price_ema);
    let _ = writeln!(out, "Target Coverage: {:.2}", system.target_coverage());
    let _ = writeln!(out, "Real Coverage: {:.2}", system.real_coverage());
    let _ = writeln!(out, "Leverage: {:.2}", system.leverage());
    let _ = write!(out, "====================");
    out
}

pub fn format_summary(system: &StableSystem) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- System Summary ---");
    let _ = writeln!(out, "Time: {}", system.time);
    let _ = writeln!(out, "BTC Collateral: {:.4} BTC", system.btc_collateral);
    let _ = writeln!(
        out,
        "Collateral Value: {:.2} USD (Price {:.2} USD/BTC)",
        system.collateral_value(),
        system.price
    );
    let _ = writeln!(out, "180d Average Price: {:.2} USD", system.price_ma180);
    let _ = writeln!(out, "Price EMA: {:.2} USD", system.price_ema);
    let _ = writeln!(out, "Parameter Coverage: {:.2}", system.param_coverage);
    let _ = writeln!(out, "Target Coverage: {:.2}", system.target_coverage());
    let _ = writeln!(out, "Leverage: {:.2}", system.leverage());
    let _ = writeln!(out, "DoC Supply: {:.2} DoC", system.doc_supply);
    let _ = writeln!(out, "BPro Supply: {:.4} BPro", system.bpro_supply);
    let _ = writeln!(
        out,
        "BPro Price: {:.2} USD ({:.4} BTC/BPro)",
        system.bpro_price(),
        system.bpro_price_btc()
    );
    let _ = writeln!(out, "BPro Value: {:.4} BTC", system.bpro_value_btc());
    let _ = write!(out, "-----------------------");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_header_and_infinite_coverage() {
        let mut system = StableSystem::default();
        system.doc_supply = 0.0;
        let rows = vec![ReportRow::from_system(&system)];

        let mut buf = Vec::new();
        write_report_to(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), REPORT_COLUMNS.join(","));
        let fields: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(fields.len(), 10);
        assert_eq!(fields[0].parse::<f64>().unwrap(), 25000.0);
        assert_eq!(fields[4].parse::<f64>().unwrap(), 0.0);
        assert_eq!(fields[6].parse::<f64>().unwrap(), 1.0);
        assert!(fields[8].parse::<f64>().unwrap().is_infinite());
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_empty_report_has_header_only() {
        let mut buf = Vec::new();
        write_report_to(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().trim_end(), REPORT_COLUMNS.join(","));
    }

    #[test]
    fn test_row_from_system() {
        let system = StableSystem::default();
        let row = ReportRow::from_system(&system);
        assert_eq!(row.target_coverage, 2.0);
        assert_eq!(row.real_coverage, 50000.0);
        assert_eq!(row.bpro_price, 0.0);
    }

    #[test]
    fn test_panel_and_summary_render_state() {
        let system = StableSystem::default();

        let panel = format_panel(&system);
        assert!(panel.starts_with("=== System Panel ==="));
        assert!(panel.contains("BTC Collateral: 100.0000 BTC"));
        assert!(panel.contains("Target Coverage: 2.00"));

        let summary = format_summary(&system);
        assert!(summary.contains("Time: 0"));
        assert!(summary.contains("Collateral Value: 2500000.00 USD (Price 25000.00 USD/BTC)"));
        assert!(summary.contains("DoC Supply: 50.00 DoC"));
    }
}
