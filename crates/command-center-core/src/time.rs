//! UTC timestamps in the second-precision `YYYY-MM-DDTHH:MM:SSZ` form viewers expect.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp with second precision and a `Z` suffix.
pub fn format_utc(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// The current time, already formatted.
pub fn now_stamp() -> String {
    format_utc(&Utc::now())
}

/// Serde adapter for `DateTime<Utc>` fields using [`format_utc`].
///
/// Deserialization accepts any RFC 3339 timestamp.
pub mod utc_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_utc(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
