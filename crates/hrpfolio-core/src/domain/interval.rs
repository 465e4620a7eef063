use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Bar spacing for historical series requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

/// Regular trading minutes per day: a 6.5-hour session.
const SESSION_MINUTES: u32 = 390;

/// Trading days per year used for annualization.
const TRADING_DAYS: u32 = 252;

impl Interval {
    /// Bar length in minutes of regular trading time. A daily bar spans the
    /// whole session.
    const fn bar_minutes(self) -> u32 {
        match self {
            Self::OneMinute => 1,
            Self::FiveMinutes => 5,
            Self::FifteenMinutes => 15,
            Self::OneHour => 60,
            Self::OneDay => SESSION_MINUTES,
        }
    }

    /// Annualization factor for returns sampled at this interval: traded
    /// minutes per year divided by the bar length (daily bars give 252).
    pub const fn periods_per_year(self) -> f64 {
        (TRADING_DAYS * SESSION_MINUTES / self.bar_minutes()) as f64
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // "1day" is the spelling some upstream providers use for daily bars.
        match value.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "1h" => Ok(Self::OneHour),
            "1d" | "1day" => Ok(Self::OneDay),
            other => Err(ValidationError::InvalidInterval {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_and_alias_spellings() {
        assert_eq!(Interval::from_str("1d").expect("must parse"), Interval::OneDay);
        assert_eq!(Interval::from_str(" 1DAY ").expect("must parse"), Interval::OneDay);
        assert_eq!(Interval::from_str("15m").expect("must parse"), Interval::FifteenMinutes);
    }

    #[test]
    fn rejects_unsupported_spacing() {
        let err = Interval::from_str("2h").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidInterval { .. }));
    }

    #[test]
    fn annualization_scales_with_bars_per_session() {
        assert_eq!(Interval::OneDay.periods_per_year(), 252.0);
        assert_eq!(Interval::OneHour.periods_per_year(), 1_638.0);
        assert_eq!(Interval::OneMinute.periods_per_year(), 98_280.0);
    }

    #[test]
    fn serde_uses_the_wire_spelling() {
        let json = serde_json::to_string(&Interval::FiveMinutes).expect("serializable");
        assert_eq!(json, "\"5m\"");
    }
}
