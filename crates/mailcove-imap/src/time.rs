//! Time abstraction for testability.
//!
//! The search compiler turns absolute timestamps into `OLDER`/`YOUNGER`
//! offsets relative to "now"; a `Clock` trait keeps that computation
//! deterministic in tests.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Abstraction over wall-clock time.
///
/// In production, use [`SystemClock`]. In tests, use [`MockClock`] to pin
/// time to a known instant.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock that uses real time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A mock clock pinned to a configurable instant.
#[derive(Debug)]
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    /// Creates a mock clock pinned to the given time.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += duration;
        }
    }

    /// Sets the clock to a specific time.
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = instant;
        }
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map_or_else(|_| Utc::now(), |now| *now)
    }
}

/// Formats a date as IMAP `dd-Mon-yyyy` (RFC 3501 date-text).
#[must_use]
pub fn imap_date(date: DateTime<Utc>) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// Formats a timestamp as IMAP `dd-Mon-yyyy hh:mm:ss +zzzz` (date-time),
/// used for the APPEND internal date.
#[must_use]
pub fn imap_date_time(date: DateTime<Utc>) -> String {
    date.format("%d-%b-%Y %H:%M:%S %z").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn mock_clock_is_pinned() {
        let base = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let clock = MockClock::new(base);
        assert_eq!(clock.now(), base);

        clock.advance(Duration::seconds(30));
        assert_eq!(clock.now(), base + Duration::seconds(30));
    }

    #[test]
    fn imap_date_format() {
        let date = Utc.with_ymd_and_hms(2026, 2, 3, 0, 0, 0).unwrap();
        assert_eq!(imap_date(date), "03-Feb-2026");
    }

    #[test]
    fn imap_date_time_format() {
        let date = Utc.with_ymd_and_hms(2026, 2, 3, 9, 5, 7).unwrap();
        assert_eq!(imap_date_time(date), "03-Feb-2026 09:05:07 +0000");
    }
}
