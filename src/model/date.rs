use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Calendar day a record was created on, or an explicit "unknown".
///
/// Records without a usable timestamp stay `Unknown`; nothing downstream
/// invents a date for them. Timelines skip unknown dates and date-range
/// filters exclude them once a bound is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RecordDate {
    Known(NaiveDate),
    #[default]
    Unknown,
}

impl RecordDate {
    /// Parse an ISO date or date-time, truncating to the day.
    ///
    /// Accepts RFC 3339 (`2024-01-01T10:00:00Z`), naive date-times with a
    /// `T` or space separator, and bare dates.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Unknown;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Self::Known(dt.date_naive());
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Self::Known(dt.date());
            }
        }

        // Bare date, or a date-time with an offset format chrono rejects.
        raw.get(..10)
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
            .map_or(Self::Unknown, Self::Known)
    }

    pub fn known(self) -> Option<NaiveDate> {
        match self {
            Self::Known(day) => Some(day),
            Self::Unknown => None,
        }
    }
}

impl From<NaiveDate> for RecordDate {
    fn from(day: NaiveDate) -> Self {
        Self::Known(day)
    }
}

impl fmt::Display for RecordDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(day) => write!(f, "{}", day.format("%Y-%m-%d")),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for RecordDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(day) => serializer.serialize_str(&day.format("%Y-%m-%d").to_string()),
            Self::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for RecordDate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = super::wire::loose_text(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Unknown, Self::parse))
    }
}
