//! Error types for the simulation engine and its loaders.

use thiserror::Error;

/// Which token a failed redeem was attempted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Doc,
    BPro,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Doc => write!(f, "DoC"),
            Self::BPro => write!(f, "BPro"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    /// Redeem amount exceeds the outstanding supply.
    #[error("not enough {token} tokens to redeem: requested {requested}, outstanding {available}")]
    InsufficientSupply {
        token: Token,
        requested: f64,
        available: f64,
    },

    #[error("missing column {0:?}")]
    MissingColumn(String),

    #[error("invalid number {value:?} in column {column:?}")]
    InvalidNumber { column: String, value: String },

    #[error("invalid date {0:?}")]
    InvalidDate(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Whether the caller can retry with different input (e.g. a smaller amount).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientSupply { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;
