use std::time::Duration;

use crate::retry::RetryConfig;
use crate::{AnalyticsError, Interval};

/// Per-category cache freshness windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub quote: Duration,
    pub historical: Duration,
    pub fundamentals: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            quote: Duration::from_secs(900),
            historical: Duration::from_secs(3_600),
            fundamentals: Duration::from_secs(86_400),
        }
    }
}

/// Configuration surface consumed by the analytics core.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub cache_ttls: CacheTtls,
    pub default_interval: Interval,
    pub default_lookback: u32,
    /// Annualized risk-free rate used in the Sharpe numerator.
    pub risk_free_rate: f64,
    /// Minimum aligned observations a symbol needs to survive alignment.
    pub min_observations: usize,
    /// Minimum surviving symbols required by the HRP operation.
    pub min_symbols: usize,
    /// Wall-clock bound on the fetch phase of a request.
    pub request_deadline: Duration,
    /// Minimum spacing between successive upstream calls, process-wide.
    pub min_call_spacing: Duration,
    pub retry: RetryConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttls: CacheTtls::default(),
            default_interval: Interval::OneDay,
            default_lookback: 30,
            risk_free_rate: 0.0,
            min_observations: 30,
            min_symbols: 2,
            request_deadline: Duration::from_secs(30),
            min_call_spacing: Duration::from_millis(500),
            retry: RetryConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Check internal consistency before wiring the config into services.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.default_lookback < 2 {
            return Err(AnalyticsError::configuration(format!(
                "default_lookback must be at least 2, got {}",
                self.default_lookback
            )));
        }
        if self.min_observations < 2 {
            return Err(AnalyticsError::configuration(format!(
                "min_observations must be at least 2, got {}",
                self.min_observations
            )));
        }
        if self.min_symbols < 2 {
            return Err(AnalyticsError::configuration(format!(
                "min_symbols must be at least 2, got {}",
                self.min_symbols
            )));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(AnalyticsError::configuration(
                "risk_free_rate must be finite",
            ));
        }
        if self.request_deadline.is_zero() {
            return Err(AnalyticsError::configuration(
                "request_deadline must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn default_config_is_valid() {
        AnalyticsConfig::default().validate().expect("must be valid");
    }

    #[test]
    fn default_ttls_follow_category_windows() {
        let ttls = CacheTtls::default();
        assert_eq!(ttls.quote, Duration::from_secs(900));
        assert_eq!(ttls.historical, Duration::from_secs(3_600));
        assert_eq!(ttls.fundamentals, Duration::from_secs(86_400));
    }

    #[test]
    fn rejects_degenerate_thresholds() {
        let config = AnalyticsConfig {
            min_symbols: 1,
            ..AnalyticsConfig::default()
        };
        let err = config.validate().expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::ConfigurationError);
    }

    #[test]
    fn rejects_non_finite_risk_free_rate() {
        let config = AnalyticsConfig {
            risk_free_rate: f64::NAN,
            ..AnalyticsConfig::default()
        };
        let err = config.validate().expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::ConfigurationError);
    }
}
