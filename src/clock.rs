use std::sync::Mutex;

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Source of wall-clock time for start/complete stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used to make replays and tests
/// produce identical output.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn advance_ms(&self, ms: i64) {
        self.advance(Duration::milliseconds(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn iso8601(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whole milliseconds between two stamps, clamped at zero.
///
/// Sub-millisecond remainders are truncated, so a call that completes within
/// the same millisecond it started reports `0`.
pub fn elapsed_ms(started: DateTime<Utc>, completed: DateTime<Utc>) -> u64 {
    (completed - started).num_milliseconds().max(0) as u64
}
