//! Pure assembly of computation outputs into response records.
//!
//! Nothing here touches shared state; the functions combine already-computed
//! pieces into the serializable shapes consumed by the transport layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hrpfolio_core::{Exclusion, Symbol};

use crate::correlation::CorrelationMatrix;
use crate::hrp::{ClusterMerge, PortfolioWeights};
use crate::returns::SymbolMetrics;

/// Response record for the comparison operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub metrics: BTreeMap<String, SymbolMetrics>,
    /// Nested symbol -> symbol -> correlation map over non-degenerate
    /// symbols, rounded to 4 decimals.
    pub correlation: BTreeMap<String, BTreeMap<String, f64>>,
    pub excluded: Vec<Exclusion>,
}

/// One allocation entry, in quasi-diagonal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub symbol: String,
    pub weight: f64,
}

/// Response record for the HRP portfolio operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub weights: Vec<WeightEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_tree: Option<Vec<ClusterMerge>>,
    pub excluded: Vec<Exclusion>,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Combine metrics, the correlation matrix, and the exclusion list.
pub fn assemble_comparison(
    metric_symbols: &[Symbol],
    metrics: Vec<SymbolMetrics>,
    correlation: Option<(&[Symbol], &CorrelationMatrix)>,
    excluded: Vec<Exclusion>,
) -> ComparisonReport {
    let metrics = metric_symbols
        .iter()
        .map(|s| s.to_string())
        .zip(metrics)
        .collect();

    let correlation = match correlation {
        Some((symbols, matrix)) => symbols
            .iter()
            .enumerate()
            .map(|(i, row_symbol)| {
                let row = symbols
                    .iter()
                    .enumerate()
                    .map(|(j, col_symbol)| (col_symbol.to_string(), round4(matrix.get(i, j))))
                    .collect();
                (row_symbol.to_string(), row)
            })
            .collect(),
        None => BTreeMap::new(),
    };

    ComparisonReport {
        metrics,
        correlation,
        excluded,
    }
}

/// Combine HRP weights, the optional tree description, and the exclusion
/// list.
pub fn assemble_portfolio(
    weights: &PortfolioWeights,
    cluster_tree: Option<Vec<ClusterMerge>>,
    excluded: Vec<Exclusion>,
) -> PortfolioReport {
    PortfolioReport {
        weights: weights
            .entries()
            .iter()
            .map(|(symbol, weight)| WeightEntry {
                symbol: symbol.to_string(),
                weight: *weight,
            })
            .collect(),
        cluster_tree,
        excluded,
    }
}
