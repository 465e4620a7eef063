use serde::{Deserialize, Serialize};

use crate::{Interval, Symbol, UtcDateTime, ValidationError};

/// Closing price observation at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub ts: UtcDateTime,
    pub close: f64,
}

impl PricePoint {
    pub fn new(ts: UtcDateTime, close: f64) -> Result<Self, ValidationError> {
        if !close.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "close" });
        }
        if close < 0.0 {
            return Err(ValidationError::NegativeValue { field: "close" });
        }
        Ok(Self { ts, close })
    }
}

/// Ordered close series for one (symbol, interval) request.
///
/// Timestamps are strictly increasing with no duplicates; the constructor
/// enforces the invariant and the series is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    symbol: Symbol,
    interval: Interval,
    points: Vec<PricePoint>,
}

impl TimeSeries {
    pub fn new(
        symbol: Symbol,
        interval: Interval,
        points: Vec<PricePoint>,
    ) -> Result<Self, ValidationError> {
        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].ts <= pair[0].ts {
                return Err(ValidationError::SeriesNotIncreasing { index: index + 1 });
            }
        }

        Ok(Self {
            symbol,
            interval,
            points,
        })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent close, if any.
    pub fn latest_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// Close at an exact timestamp, if present.
    pub fn close_at(&self, ts: UtcDateTime) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.ts.cmp(&ts))
            .ok()
            .map(|idx| self.points[idx].close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(seconds: i64, close: f64) -> PricePoint {
        PricePoint::new(
            UtcDateTime::from_unix_timestamp(seconds).expect("valid ts"),
            close,
        )
        .expect("valid point")
    }

    #[test]
    fn accepts_strictly_increasing_series() {
        let series = TimeSeries::new(
            Symbol::parse("AAPL").expect("valid"),
            Interval::OneDay,
            vec![point(0, 100.0), point(86_400, 101.0), point(172_800, 99.5)],
        )
        .expect("valid series");

        assert_eq!(series.len(), 3);
        assert_eq!(series.latest_close(), Some(99.5));
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let err = TimeSeries::new(
            Symbol::parse("AAPL").expect("valid"),
            Interval::OneDay,
            vec![point(0, 100.0), point(0, 101.0)],
        )
        .expect_err("must fail");

        assert!(matches!(err, ValidationError::SeriesNotIncreasing { index: 1 }));
    }

    #[test]
    fn rejects_negative_close() {
        let ts = UtcDateTime::from_unix_timestamp(0).expect("valid");
        let err = PricePoint::new(ts, -1.0).expect_err("must fail");
        assert!(matches!(err, ValidationError::NegativeValue { field: "close" }));
    }

    #[test]
    fn close_at_finds_exact_timestamp() {
        let series = TimeSeries::new(
            Symbol::parse("MSFT").expect("valid"),
            Interval::OneDay,
            vec![point(0, 100.0), point(86_400, 101.0)],
        )
        .expect("valid series");

        let ts = UtcDateTime::from_unix_timestamp(86_400).expect("valid");
        assert_eq!(series.close_at(ts), Some(101.0));
        let missing = UtcDateTime::from_unix_timestamp(1).expect("valid");
        assert_eq!(series.close_at(missing), None);
    }
}
