//! Initial-state configuration.
//!
//! Loaded from JSON. Several fields accept older key names; each field
//! lists its keys in preference order and the first one present wins.
//!
//! ```json
//! {
//!   "btc_collateral": 100.0,
//!   "doc_supply": 50.0,
//!   "bpro_supply": 0.0,
//!   "btc_price": 25000.0,
//!   "coverage_param": 2.0,
//!   "average_180d": 25000.0,
//!   "ema_alpha": 0.1,
//!   "simulation_parameters": { "doc_threshold": 90 }
//! }
//! ```

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::state::{StableSystem, DEFAULT_DOC_THRESHOLD, DEFAULT_EMA_ALPHA};

const PARAM_COVERAGE_KEYS: &[&str] = &["param_coverage", "coverage_param", "target_parameter"];
const PRICE_MA180_KEYS: &[&str] = &["price_ma180", "average_180d", "price_average_180d"];
const SIMULATION_PARAMETERS_KEY: &str = "simulation_parameters";

/// Canonical initial state, after key fallbacks are resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimConfig {
    pub btc_collateral: f64,
    pub doc_supply: f64,
    pub bpro_supply: f64,
    pub btc_price: f64,
    pub param_coverage: f64,
    pub price_ma180: f64,
    /// Seeds from `btc_price` when absent.
    pub price_ema: Option<f64>,
    pub ema_alpha: f64,
    pub doc_threshold: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            btc_collateral: 0.0,
            doc_supply: 0.0,
            bpro_supply: 0.0,
            btc_price: 0.0,
            param_coverage: 0.0,
            price_ma180: 0.0,
            price_ema: None,
            ema_alpha: DEFAULT_EMA_ALPHA,
            doc_threshold: DEFAULT_DOC_THRESHOLD,
        }
    }
}

fn number(map: &Map<String, Value>, key: &str) -> SimResult<Option<f64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| SimError::Config(format!("{key} must be a number, got {value}"))),
    }
}

fn first_number(map: &Map<String, Value>, keys: &[&str]) -> SimResult<Option<f64>> {
    for key in keys {
        if let Some(v) = number(map, key)? {
            return Ok(Some(v));
        }
    }
    Ok(None)
}

impl SimConfig {
    pub fn from_value(value: &Value) -> SimResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| SimError::Config("top level must be a JSON object".to_string()))?;
        let defaults = Self::default();

        let doc_threshold = match map.get(SIMULATION_PARAMETERS_KEY) {
            Some(Value::Object(params)) => number(params, "doc_threshold")?,
            Some(Value::Null) | None => None,
            Some(_) => {
                return Err(SimError::Config(format!(
                    "{SIMULATION_PARAMETERS_KEY} must be an object"
                )))
            }
        };

        Ok(Self {
            btc_collateral: number(map, "btc_collateral")?.unwrap_or(defaults.btc_collateral),
            doc_supply: number(map, "doc_supply")?.unwrap_or(defaults.doc_supply),
            bpro_supply: number(map, "bpro_supply")?.unwrap_or(defaults.bpro_supply),
            btc_price: number(map, "btc_price")?.unwrap_or(defaults.btc_price),
            param_coverage: first_number(map, PARAM_COVERAGE_KEYS)?
                .unwrap_or(defaults.param_coverage),
            price_ma180: first_number(map, PRICE_MA180_KEYS)?.unwrap_or(defaults.price_ma180),
            price_ema: number(map, "price_ema")?,
            ema_alpha: number(map, "ema_alpha")?.unwrap_or(defaults.ema_alpha),
            doc_threshold: doc_threshold.unwrap_or(defaults.doc_threshold),
        })
    }

    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        debug!(path = %path.display(), ?config, "config loaded");
        Ok(config)
    }

    pub fn into_system(self) -> StableSystem {
        StableSystem {
            btc_collateral: self.btc_collateral,
            doc_supply: self.doc_supply,
            bpro_supply: self.bpro_supply,
            vault_docs: 0.0,
            price: self.btc_price,
            price_ma180: self.price_ma180,
            price_ema: self.price_ema.unwrap_or(self.btc_price),
            ema_alpha: self.ema_alpha,
            param_coverage: self.param_coverage,
            doc_threshold: self.doc_threshold,
            time: 0,
        }
    }
}

/// Load a system from `path`, or the built-in defaults when the file does
/// not exist. Other read or parse failures are returned.
pub fn load_system_or_default(path: impl AsRef<Path>) -> SimResult<StableSystem> {
    let path = path.as_ref();
    match SimConfig::from_path(path) {
        Ok(config) => Ok(config.into_system()),
        Err(SimError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(StableSystem::default())
        }
        Err(e) => Err(e),
    }
}
