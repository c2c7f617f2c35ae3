//! Wall-clock access for time-gated rules (lock period, response window).
//!
//! RULE: Nothing in the engine calls `Utc::now()` directly.
//! Time-dependent operations read the injected clock; the read-only ones
//! also have an `_at(now)` form so callers can pin the instant.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub trait Clock: Send {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock with millisecond resolution.
/// Clones share the same instant, so a test can keep a handle
/// to a clock it has given away.
#[derive(Debug, Clone)]
pub struct FixedClock {
    millis: Arc<AtomicI64>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { millis: Arc::new(AtomicI64::new(instant.timestamp_millis())) }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.millis.store(instant.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.millis.fetch_add(Duration::days(days).num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn clones_share_the_instant() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        let handle = clock.clone();
        handle.advance_days(30);
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap());
    }
}
