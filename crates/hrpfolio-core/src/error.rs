use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Symbol;

/// Validation and contract errors exposed by `hrpfolio-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid interval '{value}', expected one of 1m, 5m, 15m, 1h, 1d")]
    InvalidInterval { value: String },
    #[error("lookback must be at least 2, got {value}")]
    InvalidLookback { value: u32 },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("series timestamps must be strictly increasing (violation at index {index})")]
    SeriesNotIncreasing { index: usize },
}

/// Closed set of failure categories crossing the boundary to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidSymbol,
    InsufficientData,
    UpstreamUnavailable,
    DegenerateInput,
    ConfigurationError,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidSymbol => "invalid_symbol",
            Self::InsufficientData => "insufficient_data",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::DegenerateInput => "degenerate_input",
            Self::ConfigurationError => "configuration_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured request-level error: kind, message, offending symbol where applicable.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct AnalyticsError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
}

impl AnalyticsError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            symbol: None,
        }
    }

    pub fn for_symbol(kind: ErrorKind, symbol: Symbol, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            symbol: Some(symbol),
        }
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientData, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationError, message)
    }
}

/// Per-symbol failure collected alongside successful results.
///
/// The symbol is kept as raw text so inputs that fail validation can still be
/// reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub symbol: String,
    pub reason: ErrorKind,
    pub detail: String,
}

impl Exclusion {
    pub fn new(symbol: impl Into<String>, reason: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            reason,
            detail: detail.into(),
        }
    }
}
