use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::SECONDS_PER_DAY;

/// Unix timestamp in seconds.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Whole days from `other` to `self`, rounded towards negative infinity.
    pub fn days_since(self, other: Self) -> i64 {
        let diff = i128::from(self.0) - i128::from(other.0);
        let days = diff.div_euclid(i128::from(SECONDS_PER_DAY));
        days as i64
    }

    /// Render as ISO-8601 in UTC with millisecond precision, e.g.
    /// `2009-01-03T18:15:05.000Z`.
    pub fn to_iso8601(self) -> String {
        match i64::try_from(self.0)
            .ok()
            .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            None => format!("@{}", self.0),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Timestamp> for u64 {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

impl Deref for Timestamp {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Accepts either plain unix seconds or an RFC 3339 date-time.
impl FromStr for Timestamp {
    type Err = ParseTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u64>() {
            return Ok(Self(n));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| ParseTimestampError::Invalid(s.to_string(), e.to_string()))?;
        u64::try_from(dt.timestamp())
            .map(Self)
            .map_err(|_| ParseTimestampError::BeforeEpoch(s.to_string()))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseTimestampError {
    #[error("invalid timestamp {0:?}: {1}")]
    Invalid(String, String),

    #[error("timestamp {0:?} is before the unix epoch")]
    BeforeEpoch(String),
}
