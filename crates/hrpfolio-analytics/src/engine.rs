//! Top-level analytics operations consumed by the transport layer.

use std::sync::Arc;

use tracing::debug;

use hrpfolio_core::{
    AnalyticsError, DataFetcher, ErrorKind, Exclusion, Interval, MarketDataSource, Symbol,
};

use crate::correlation::{self, CorrelationMatrix, DistanceMatrix};
use crate::hrp::{self, ClusterTree};
use crate::report::{self, ComparisonReport, PortfolioReport};
use crate::returns::{self, SymbolMetrics};

/// Facade wiring the fetcher into the computation stages.
///
/// Cloneable and safe to share across concurrent requests: the computation
/// stages are pure, and the fetcher's cache and pacer are the only shared
/// mutable state.
#[derive(Clone)]
pub struct AnalyticsEngine {
    fetcher: DataFetcher,
}

impl std::fmt::Debug for AnalyticsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsEngine").finish_non_exhaustive()
    }
}

impl AnalyticsEngine {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        config: hrpfolio_core::AnalyticsConfig,
    ) -> Result<Self, AnalyticsError> {
        Ok(Self {
            fetcher: DataFetcher::new(source, config)?,
        })
    }

    pub fn fetcher(&self) -> &DataFetcher {
        &self.fetcher
    }

    /// Comparative risk/return metrics plus the correlation matrix.
    ///
    /// Partial-success: per-symbol failures land in the exclusion list; the
    /// request fails only when fewer than two symbols survive.
    pub async fn compare_symbols(
        &self,
        symbols: &[String],
        interval: Option<Interval>,
        lookback: Option<u32>,
    ) -> Result<ComparisonReport, AnalyticsError> {
        let config = self.fetcher.config().clone();
        let interval = interval.unwrap_or(config.default_interval);
        let lookback = lookback.unwrap_or(config.default_lookback);

        let (aligned, mut excluded) = self
            .fetcher
            .fetch_aligned(symbols, interval, lookback)
            .await?;

        let ppy = interval.periods_per_year();
        let metrics: Vec<SymbolMetrics> = aligned
            .closes
            .iter()
            .map(|row| returns::compute_metrics(row, ppy, config.risk_free_rate))
            .collect();

        let return_rows = returns::returns_matrix(&aligned.closes);
        let (corr_symbols, corr_rows) =
            split_degenerate(&aligned.symbols, return_rows, &mut excluded);

        debug!(
            symbols = aligned.symbol_count(),
            observations = aligned.observations(),
            excluded = excluded.len(),
            "assembled comparison"
        );

        let correlation = if corr_symbols.len() >= 2 {
            Some(CorrelationMatrix::from_returns(&corr_rows))
        } else {
            None
        };

        Ok(report::assemble_comparison(
            &aligned.symbols,
            metrics,
            correlation
                .as_ref()
                .map(|matrix| (corr_symbols.as_slice(), matrix)),
            excluded,
        ))
    }

    /// Hierarchical Risk Parity weights over the surviving symbol set.
    pub async fn hrp_portfolio(
        &self,
        symbols: &[String],
        interval: Option<Interval>,
        lookback: Option<u32>,
    ) -> Result<PortfolioReport, AnalyticsError> {
        let config = self.fetcher.config().clone();
        let interval = interval.unwrap_or(config.default_interval);
        let lookback = lookback.unwrap_or(config.default_lookback);

        let (aligned, mut excluded) = self
            .fetcher
            .fetch_aligned(symbols, interval, lookback)
            .await?;

        let return_rows = returns::returns_matrix(&aligned.closes);
        let (surviving, rows) = split_degenerate(&aligned.symbols, return_rows, &mut excluded);

        if surviving.len() < config.min_symbols {
            return Err(AnalyticsError::insufficient_data(format!(
                "{} symbols survived exclusion, {} required for allocation",
                surviving.len(),
                config.min_symbols
            )));
        }

        let variances: Vec<f64> = rows.iter().map(|row| returns::variance(row)).collect();
        let distance =
            DistanceMatrix::from_correlation(&CorrelationMatrix::from_returns(&rows));

        let tree = ClusterTree::build(&distance)?;
        let weights = hrp::weights_from_tree(&surviving, &tree, &variances);

        debug!(
            symbols = surviving.len(),
            merges = tree.nodes().len() - tree.leaf_count(),
            "allocated portfolio"
        );

        Ok(report::assemble_portfolio(
            &weights,
            Some(tree.describe(&surviving)),
            excluded,
        ))
    }
}

/// Drop zero-variance return rows, recording a `degenerate_input` exclusion
/// for each.
fn split_degenerate(
    symbols: &[Symbol],
    rows: Vec<Vec<f64>>,
    excluded: &mut Vec<Exclusion>,
) -> (Vec<Symbol>, Vec<Vec<f64>>) {
    let degenerate = correlation::degenerate_rows(&rows);
    if degenerate.is_empty() {
        return (symbols.to_vec(), rows);
    }

    let mut surviving = Vec::with_capacity(symbols.len() - degenerate.len());
    let mut kept_rows = Vec::with_capacity(symbols.len() - degenerate.len());
    for (i, row) in rows.into_iter().enumerate() {
        if degenerate.contains(&i) {
            excluded.push(Exclusion::new(
                symbols[i].clone(),
                ErrorKind::DegenerateInput,
                "zero-variance return series",
            ));
        } else {
            surviving.push(symbols[i].clone());
            kept_rows.push(row);
        }
    }
    (surviving, kept_rows)
}
