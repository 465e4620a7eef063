use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// Bar timestamp stored as whole Unix seconds, rendered as RFC3339 UTC.
///
/// Second precision is enough for every supported interval, and the integer
/// representation keeps ordering, hashing, and the inner join on timestamps
/// trivial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime {
    unix_seconds: i64,
}

impl UtcDateTime {
    /// Parse an RFC3339 string carrying an explicit UTC offset.
    ///
    /// Non-UTC offsets are rejected rather than converted so that upstream
    /// payloads with mixed zones surface as errors instead of silently
    /// shifting bars.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let not_utc = || ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        };

        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| not_utc())?;
        if parsed.offset() != UtcOffset::UTC {
            return Err(not_utc());
        }

        Ok(Self {
            unix_seconds: parsed.unix_timestamp(),
        })
    }

    /// Build from a Unix timestamp in seconds.
    pub fn from_unix_timestamp(seconds: i64) -> Result<Self, ValidationError> {
        // Range-check through `time` so formatting cannot fail later.
        OffsetDateTime::from_unix_timestamp(seconds).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: seconds.to_string(),
            }
        })?;

        Ok(Self {
            unix_seconds: seconds,
        })
    }

    pub fn unix_timestamp(self) -> i64 {
        self.unix_seconds
    }

    pub fn format_rfc3339(self) -> String {
        OffsetDateTime::from_unix_timestamp(self.unix_seconds)
            .expect("range checked on construction")
            .format(&Rfc3339)
            .expect("whole-second UTC datetimes are RFC3339 formattable")
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_rfc3339() {
        let ts = UtcDateTime::parse("2024-03-01T14:30:00Z").expect("must parse");
        assert_eq!(ts.format_rfc3339(), "2024-03-01T14:30:00Z");
    }

    #[test]
    fn rejects_non_utc_offsets() {
        let err = UtcDateTime::parse("2024-03-01T14:30:00+01:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn epoch_formats_as_expected() {
        let ts = UtcDateTime::from_unix_timestamp(0).expect("valid");
        assert_eq!(ts.format_rfc3339(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn ordering_follows_unix_seconds() {
        let earlier = UtcDateTime::from_unix_timestamp(1_000).expect("valid");
        let later = UtcDateTime::from_unix_timestamp(2_000).expect("valid");
        assert!(earlier < later);
        assert_eq!(later.unix_timestamp(), 2_000);
    }

    #[test]
    fn rejects_out_of_range_seconds() {
        let err = UtcDateTime::from_unix_timestamp(i64::MAX).expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }
}
