//! Time source port.
//!
//! HTLC expiry is compared against "now" on every lock, claim and query.
//! The engine reads time only through [`TimeSource`] so tests can pin and
//! advance it.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current Unix time in whole seconds, clamped at zero.
    fn now_secs(&self) -> u64 {
        u64::try_from(self.now().timestamp()).unwrap_or(0)
    }
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven time source with one-second resolution.
#[derive(Debug)]
pub struct ManualTimeSource {
    secs: AtomicI64,
}

impl ManualTimeSource {
    #[must_use]
    pub fn at(secs: i64) -> Self {
        Self {
            secs: AtomicI64::new(secs),
        }
    }

    pub fn set(&self, secs: i64) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.secs.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_source_advances() {
        let clock = ManualTimeSource::at(1_000);
        assert_eq!(clock.now_secs(), 1_000);
        clock.advance(60);
        assert_eq!(clock.now_secs(), 1_060);
        clock.set(5);
        assert_eq!(clock.now().timestamp(), 5);
    }

    #[test]
    fn negative_time_clamps_to_zero() {
        let clock = ManualTimeSource::at(-10);
        assert_eq!(clock.now_secs(), 0);
    }

    #[test]
    fn system_source_is_recent() {
        assert!(SystemTimeSource.now_secs() > 1_600_000_000);
    }
}
