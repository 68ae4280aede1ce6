use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::TypeError;

/// Wall clock that never repeats or goes backwards.
///
/// Each call to [`MonotonicClock::now`] returns a timestamp strictly greater
/// than every previous one from the same clock, at microsecond resolution.
/// When the wall clock has not advanced (or stepped backwards) since the last
/// reading, the previous reading plus one microsecond is returned instead.
///
/// Document ids are derived from these readings, so two posts created in the
/// same process can never collide.
pub struct MonotonicClock {
    last_micros: Mutex<i64>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            last_micros: Mutex::new(i64::MIN),
        }
    }

    /// Next strictly increasing timestamp.
    pub fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut last = self
            .last_micros
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let next = if wall > *last { wall } else { *last + 1 };
        *last = next;
        DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MonotonicClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonotonicClock").finish_non_exhaustive()
    }
}

/// Canonical text form of a timestamp: RFC 3339, UTC, nanoseconds.
///
/// Fixed width, so lexicographic order equals chronological order. The SQLite
/// backing relies on this for `ORDER BY created_at`. Full nanosecond precision
/// keeps a stored timestamp equal to the one that was written.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a timestamp written by [`format_timestamp`] (any RFC 3339 is accepted).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TypeError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TypeError::InvalidTimestamp(format!("{s:?}: {e}")))
}
