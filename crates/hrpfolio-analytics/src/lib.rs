//! # hrpfolio-analytics
//!
//! Numerical half of hrpfolio: periodic returns and risk metrics, the
//! correlation/distance engine, the Hierarchical Risk Parity optimizer, and
//! the assembly of response records.
//!
//! All computation stages are pure, deterministic functions of their inputs;
//! the only stateful collaborator is the [`DataFetcher`](hrpfolio_core::DataFetcher)
//! behind [`AnalyticsEngine`].
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`correlation`] | Pearson correlation and clustering distance |
//! | [`engine`] | Top-level comparison and HRP operations |
//! | [`hrp`] | Cluster tree, quasi-diagonal ordering, recursive bisection |
//! | [`report`] | Response record assembly |
//! | [`returns`] | Periodic returns and per-symbol metrics |

pub mod correlation;
pub mod engine;
pub mod hrp;
pub mod report;
pub mod returns;

pub use correlation::{CorrelationMatrix, DistanceMatrix};
pub use engine::AnalyticsEngine;
pub use hrp::{ClusterMerge, ClusterNode, ClusterTree, PortfolioWeights};
pub use report::{ComparisonReport, PortfolioReport, WeightEntry};
pub use returns::SymbolMetrics;
