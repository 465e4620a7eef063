//! # hrpfolio-core
//!
//! Domain contracts and data acquisition for the hrpfolio analytics engine.
//!
//! ## Overview
//!
//! This crate provides the non-numerical half of hrpfolio:
//!
//! - **Validated domain types** for symbols, intervals, timestamps, and
//!   price series
//! - **Upstream contract** ([`MarketDataSource`]) with a tagged error type
//! - **Cache store** with per-category freshness windows and per-key
//!   single-flight guards
//! - **Call pacer** serializing network egress process-wide
//! - **Data fetcher** resolving symbol sets to aligned close matrices
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | In-memory store with freshness windows and single-flight |
//! | [`config`] | Configuration surface consumed by the core |
//! | [`data_source`] | Upstream market-data contract |
//! | [`domain`] | Domain models (Symbol, Interval, TimeSeries) |
//! | [`error`] | Structured error types and exclusion records |
//! | [`fetcher`] | Cache-aware, rate-limited series acquisition |
//! | [`retry`] | Backoff policies for the fetch path |
//! | [`throttling`] | Process-wide call pacing |
//!
//! ## Error Handling
//!
//! Per-symbol failures surface as [`Exclusion`] records alongside successful
//! results; request-level failures are [`AnalyticsError`] values carrying a
//! closed [`ErrorKind`]. Nothing crossing the crate boundary is an untyped
//! failure.

pub mod cache;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod retry;
pub mod throttling;

// Re-export commonly used types at crate root for convenience

pub use cache::{CacheCategory, CacheEntry, CacheKey, CacheLookup, CacheStore};
pub use config::{AnalyticsConfig, CacheTtls};
pub use data_source::{
    Fundamentals, MarketDataSource, Quote, SeriesRequest, SourceError, SourceErrorKind,
    SourceFuture,
};
pub use domain::{Interval, PricePoint, Symbol, TimeSeries, UtcDateTime};
pub use error::{AnalyticsError, ErrorKind, Exclusion, ValidationError};
pub use fetcher::{AlignedSeries, DataFetcher, FetchedSeries};
pub use retry::{Backoff, RetryConfig};
pub use throttling::CallPacer;
