//! Behavior tests for the partial-success error model: exclusions keep the
//! batch alive, and requests fail only when too few symbols survive.

use std::sync::Arc;

use hrpfolio_analytics::AnalyticsEngine;
use hrpfolio_core::{AnalyticsConfig, ErrorKind, MarketDataSource};

use hrpfolio_tests::{fast_config, wavy_closes, MockSource};

fn syms(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_owned()).collect()
}

fn engine_over(source: Arc<MockSource>, config: AnalyticsConfig) -> AnalyticsEngine {
    AnalyticsEngine::new(source as Arc<dyn MarketDataSource>, config).expect("valid config")
}

// =============================================================================
// Invalid symbols
// =============================================================================

#[tokio::test]
async fn when_symbol_text_is_invalid_batch_continues_with_exclusion() {
    let source = Arc::new(
        MockSource::new()
            .with_series("AAPL", wavy_closes(10, 100.0, 2.0, 0))
            .with_series("MSFT", wavy_closes(10, 300.0, 3.0, 1)),
    );
    let engine = engine_over(source, fast_config());

    let report = engine
        .compare_symbols(&syms(&["AAPL", "no$good", "MSFT"]), None, None)
        .await
        .expect("valid symbols carry the batch");

    assert_eq!(report.metrics.len(), 2);
    assert!(report.metrics.contains_key("AAPL"));
    assert!(report.metrics.contains_key("MSFT"));

    assert_eq!(report.excluded.len(), 1);
    // The raw input is reported back, not a normalized form.
    assert_eq!(report.excluded[0].symbol, "no$good");
    assert_eq!(report.excluded[0].reason, ErrorKind::InvalidSymbol);
}

#[tokio::test]
async fn when_provider_rejects_a_symbol_it_is_excluded() {
    let source = Arc::new(
        MockSource::new()
            .with_series("AAPL", wavy_closes(10, 100.0, 2.0, 0))
            .with_series("MSFT", wavy_closes(10, 300.0, 3.0, 1)),
    );
    let engine = engine_over(source, fast_config());

    let report = engine
        .compare_symbols(&syms(&["AAPL", "ZZZZ", "MSFT"]), None, None)
        .await
        .expect("known symbols carry the batch");

    assert_eq!(report.metrics.len(), 2);
    assert_eq!(report.excluded.len(), 1);
    assert_eq!(report.excluded[0].symbol, "ZZZZ");
    assert_eq!(report.excluded[0].reason, ErrorKind::InvalidSymbol);
}

// =============================================================================
// Upstream failures
// =============================================================================

#[tokio::test]
async fn when_failures_are_transient_retries_recover_the_batch() {
    let source = Arc::new(
        MockSource::new()
            .with_series("AAPL", wavy_closes(10, 100.0, 2.0, 0))
            .with_series("MSFT", wavy_closes(10, 300.0, 3.0, 1))
            .fail_first(2),
    );
    let engine = engine_over(source.clone(), fast_config());

    let report = engine
        .compare_symbols(&syms(&["AAPL", "MSFT"]), None, None)
        .await
        .expect("retries absorb the transient failures");

    assert!(report.excluded.is_empty());
    assert_eq!(report.metrics.len(), 2);
    // Two failed attempts and two successes, however they interleave.
    assert_eq!(source.call_count(), 4);
}

#[tokio::test]
async fn when_symbol_keeps_failing_it_is_excluded_after_retries() {
    let source = Arc::new(
        MockSource::new()
            .with_series("AAPL", wavy_closes(10, 100.0, 2.0, 0))
            .with_series("MSFT", wavy_closes(10, 300.0, 3.0, 1))
            .with_failing_series("DOWN"),
    );
    let engine = engine_over(source.clone(), fast_config());

    let report = engine
        .compare_symbols(&syms(&["AAPL", "DOWN", "MSFT"]), None, None)
        .await
        .expect("healthy symbols carry the batch");

    assert_eq!(report.metrics.len(), 2);
    assert_eq!(report.excluded.len(), 1);
    assert_eq!(report.excluded[0].symbol, "DOWN");
    assert_eq!(report.excluded[0].reason, ErrorKind::UpstreamUnavailable);
    // One call per healthy symbol, initial attempt plus three retries for DOWN.
    assert_eq!(source.call_count(), 6);
}

#[tokio::test]
async fn when_no_symbols_survive_request_fails() {
    let source = Arc::new(
        MockSource::new()
            .with_series("AAPL", wavy_closes(10, 100.0, 2.0, 0))
            .with_series("MSFT", wavy_closes(10, 300.0, 3.0, 1)),
    );
    source.set_unavailable(true);
    let engine = engine_over(source, fast_config());

    let err = engine
        .compare_symbols(&syms(&["AAPL", "MSFT"]), None, None)
        .await
        .expect_err("nothing survives a total outage with a cold cache");

    assert_eq!(err.kind, ErrorKind::InsufficientData);
}

// =============================================================================
// Degenerate inputs
// =============================================================================

#[tokio::test]
async fn when_series_is_flat_allocation_excludes_it() {
    let source = Arc::new(
        MockSource::new()
            .with_series("AAPL", wavy_closes(10, 100.0, 2.0, 0))
            .with_series("MSFT", wavy_closes(10, 300.0, 3.0, 1))
            .with_series("FLAT", vec![100.0; 10]),
    );
    let engine = engine_over(source, fast_config());

    let report = engine
        .hrp_portfolio(&syms(&["AAPL", "MSFT", "FLAT"]), None, None)
        .await
        .expect("non-degenerate symbols carry the batch");

    assert_eq!(report.weights.len(), 2);
    let sum: f64 = report.weights.iter().map(|w| w.weight).sum();
    assert!((sum - 1.0).abs() < 1e-9);

    assert_eq!(report.excluded.len(), 1);
    assert_eq!(report.excluded[0].symbol, "FLAT");
    assert_eq!(report.excluded[0].reason, ErrorKind::DegenerateInput);
}

#[tokio::test]
async fn when_exclusions_leave_one_symbol_allocation_fails() {
    let source = Arc::new(
        MockSource::new()
            .with_series("AAPL", wavy_closes(10, 100.0, 2.0, 0))
            .with_series("FLAT", vec![100.0; 10]),
    );
    let engine = engine_over(source, fast_config());

    let err = engine
        .hrp_portfolio(&syms(&["AAPL", "FLAT"]), None, None)
        .await
        .expect_err("one survivor cannot be allocated");

    assert_eq!(err.kind, ErrorKind::InsufficientData);
}

#[tokio::test]
async fn comparison_still_reports_metrics_for_degenerate_symbols() {
    let source = Arc::new(
        MockSource::new()
            .with_series("AAPL", wavy_closes(10, 100.0, 2.0, 0))
            .with_series("MSFT", wavy_closes(10, 300.0, 3.0, 1))
            .with_series("FLAT", vec![100.0; 10]),
    );
    let engine = engine_over(source, fast_config());

    let report = engine
        .compare_symbols(&syms(&["AAPL", "MSFT", "FLAT"]), None, None)
        .await
        .expect("comparison succeeds");

    // Metrics stay defined for the flat series even though correlation drops it.
    assert_eq!(report.metrics.len(), 3);
    let flat = report.metrics.get("FLAT").expect("present");
    assert_eq!(flat.latest, Some(100.0));
    assert_eq!(flat.annualized_volatility, Some(0.0));
    assert!(flat.sharpe_ratio.is_none());

    assert_eq!(report.correlation.len(), 2);
    assert!(!report.correlation.contains_key("FLAT"));
    assert_eq!(report.excluded.len(), 1);
    assert_eq!(report.excluded[0].reason, ErrorKind::DegenerateInput);
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn when_configuration_is_degenerate_engine_construction_fails() {
    let source = Arc::new(MockSource::new());
    let config = AnalyticsConfig {
        min_symbols: 1,
        ..fast_config()
    };

    let err = AnalyticsEngine::new(source as Arc<dyn MarketDataSource>, config)
        .expect_err("degenerate thresholds must be rejected");
    assert_eq!(err.kind, ErrorKind::ConfigurationError);
}
