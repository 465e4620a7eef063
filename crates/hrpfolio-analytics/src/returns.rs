//! Periodic returns and per-symbol risk/return metrics.

use serde::{Deserialize, Serialize};

/// Per-symbol metrics derived from an aligned close series.
///
/// Undefined metrics (too few returns, zero volatility) are `None`; NaN never
/// crosses the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMetrics {
    pub latest: Option<f64>,
    pub cumulative_return: Option<f64>,
    pub annualized_volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub var95: Option<f64>,
}

impl SymbolMetrics {
    pub fn undefined() -> Self {
        Self {
            latest: None,
            cumulative_return: None,
            annualized_volatility: None,
            sharpe_ratio: None,
            var95: None,
        }
    }
}

/// Simple periodic returns: `r_t = (P_t - P_{t-1}) / P_{t-1}`.
///
/// A zero previous close yields a flat return rather than an infinity.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|pair| {
            if pair[0] == 0.0 {
                0.0
            } else {
                (pair[1] - pair[0]) / pair[0]
            }
        })
        .collect()
}

/// Returns row per close row, preserving row order.
pub fn returns_matrix(closes: &[Vec<f64>]) -> Vec<Vec<f64>> {
    closes.iter().map(|row| simple_returns(row)).collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (ddof = 0), matching the volatility definition.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Empirical quantile with linear interpolation between order statistics.
fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = rank - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Historical VaR at 95% confidence: the 5th-percentile return reported as a
/// positive loss magnitude.
pub fn var95(returns: &[f64]) -> Option<f64> {
    quantile(returns, 0.05).map(|q| (-q).max(0.0))
}

/// Compute the full metric set for one aligned close series.
pub fn compute_metrics(closes: &[f64], periods_per_year: f64, risk_free_rate: f64) -> SymbolMetrics {
    let returns = simple_returns(closes);
    if returns.len() < 2 {
        return SymbolMetrics {
            latest: closes.last().copied(),
            ..SymbolMetrics::undefined()
        };
    }

    let cumulative = returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
    let annualized_volatility = variance(&returns).sqrt() * periods_per_year.sqrt();
    let sharpe_ratio = if annualized_volatility == 0.0 {
        None
    } else {
        Some((mean(&returns) * periods_per_year - risk_free_rate) / annualized_volatility)
    };

    SymbolMetrics {
        latest: closes.last().copied(),
        cumulative_return: Some(cumulative),
        annualized_volatility: Some(annualized_volatility),
        sharpe_ratio,
        var95: var95(&returns),
    }
}
