//! Upstream market-data contract.
//!
//! The analytics core depends only on this trait; transport, authentication,
//! and payload schema of the concrete provider live outside the crate. Each
//! call returns a tagged result discriminating the success payload from a
//! closed set of error kinds.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{Interval, Symbol, TimeSeries, UtcDateTime, ValidationError};

/// Boxed future returned by [`MarketDataSource`] methods.
pub type SourceFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Latest quote snapshot for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
    pub currency: String,
    pub as_of: UtcDateTime,
}

/// Fundamentals snapshot for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: Symbol,
    pub as_of: UtcDateTime,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
}

/// Validated historical-series request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub symbol: Symbol,
    pub interval: Interval,
    pub lookback: u32,
}

impl SeriesRequest {
    pub fn new(symbol: Symbol, interval: Interval, lookback: u32) -> Result<Self, ValidationError> {
        if lookback < 2 {
            return Err(ValidationError::InvalidLookback { value: lookback });
        }
        Ok(Self {
            symbol,
            interval,
            lookback,
        })
    }
}

/// Upstream-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    InvalidSymbol,
    Unavailable,
    RateLimited,
    Internal,
}

/// Structured upstream error used by the fetch path to decide on retries
/// and stale-cache fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn invalid_symbol(symbol: &Symbol) -> Self {
        Self {
            kind: SourceErrorKind::InvalidSymbol,
            message: format!("symbol '{symbol}' is not known to the provider"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for SourceError {}

/// Contract implemented by concrete market-data providers.
pub trait MarketDataSource: Send + Sync {
    /// Fetches the latest quote for a symbol.
    fn quote<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, Quote>;

    /// Fetches a historical close series.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the symbol is unknown to the provider, the
    /// provider is unavailable, or rate limiting is in effect.
    fn time_series<'a>(&'a self, req: SeriesRequest) -> SourceFuture<'a, TimeSeries>;

    /// Fetches company fundamentals.
    fn fundamentals<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, Fundamentals>;
}
