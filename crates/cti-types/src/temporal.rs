use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Text layout used for storage and the canonical object form.
///
/// Fixed-width with millisecond precision, so lexical order equals
/// chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// `0000-01-01T00:00:00.000Z`, the earliest instant with a four-digit year.
pub const MIN_MILLIS: i64 = -62_167_219_200_000;

/// `9999-12-31T23:59:59.999Z`, the latest instant with a four-digit year.
pub const MAX_MILLIS: i64 = 253_402_300_799_999;

/// UTC instant with millisecond precision.
///
/// Every version of a STIX object is distinguished by a `Timestamp`. The
/// textual form (`2024-03-01T12:00:00.000Z`) sorts the same way the
/// instants do, which lets the storage layer compare timestamps as text.
///
/// Only years 0000 through 9999 are representable: outside that range the
/// text form loses its fixed width and can no longer be parsed back.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current wall-clock time, truncated to milliseconds.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(3))
    }

    /// Wrap a `DateTime`, truncating to milliseconds. `None` outside years
    /// 0000 through 9999.
    pub fn from_datetime(dt: DateTime<Utc>) -> Option<Self> {
        let dt = dt.trunc_subsecs(3);
        (MIN_MILLIS..=MAX_MILLIS)
            .contains(&dt.timestamp_millis())
            .then_some(Self(dt))
    }

    /// Build from milliseconds since the UNIX epoch. `None` outside years
    /// 0000 through 9999.
    pub fn from_millis(millis: i64) -> Option<Self> {
        if !(MIN_MILLIS..=MAX_MILLIS).contains(&millis) {
            return None;
        }
        DateTime::<Utc>::from_timestamp_millis(millis).map(Self)
    }

    /// Parse any RFC 3339 timestamp, normalizing to UTC milliseconds.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: String| TypeError::InvalidTimestamp {
            value: s.to_string(),
            reason,
        };
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| invalid(e.to_string()))?;
        Self::from_datetime(dt.with_timezone(&Utc))
            .ok_or_else(|| invalid("year outside 0000..=9999 after conversion to UTC".into()))
    }

    /// A timestamp strictly after `previous`.
    ///
    /// Returns the current time, or `previous + 1ms` when the clock has not
    /// moved past `previous` (fast successive calls, clock skew). Saturates
    /// at [`MAX_MILLIS`].
    pub fn after(previous: &Self) -> Self {
        let floor = previous.as_millis().saturating_add(1).min(MAX_MILLIS);
        let now = Self::now();
        if now.as_millis() >= floor {
            now
        } else {
            Self::from_millis(floor).unwrap_or(*previous)
        }
    }

    /// Milliseconds since the UNIX epoch.
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// The underlying `DateTime`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns `true` if this timestamp is strictly after `other`.
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({self})")
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_string()
    }
}
