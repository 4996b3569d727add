//! ISO-8601 timestamps as carried by the Server

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// A moment in time in the Server's textual layout
/// (`2019-07-16T12:00:00.000Z`, milliseconds, `Z` for UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Iso8601Time(DateTime<FixedOffset>);

impl Iso8601Time {
    /// Current time in UTC
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// Parse the textual layout. Fractional seconds and numeric offsets
    /// are accepted.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        DateTime::parse_from_rfc3339(text)
            .map(Self)
            .map_err(|e| CoreError::Decode(format!("invalid ISO-8601 time {:?}: {}", text, e)))
    }

    /// Underlying chrono value
    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }

    /// Convert to UTC
    pub fn to_utc(&self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Iso8601Time {
    fn from(value: DateTime<Tz>) -> Self {
        Self(value.fixed_offset())
    }
}

impl FromStr for Iso8601Time {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Iso8601Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Serialize for Iso8601Time {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Iso8601Time {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
