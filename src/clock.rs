//! Wall-clock time source.
//!
//! Token issue and verification read time through the same `Clock`, so
//! boundary checks are exact and tests can pin the current instant.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock with millisecond resolution.
///
/// Lock-free: the current instant is a single atomic, so a test can share one
/// clock across tasks and move it forward while requests are in flight.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Clock pinned at the current system time (truncated to whole seconds).
    pub fn starting_now() -> Self {
        Self::new(Utc::now()).with_truncated_seconds()
    }

    fn with_truncated_seconds(self) -> Self {
        let ms = self.millis.load(Ordering::Acquire);
        self.millis.store(ms - ms.rem_euclid(1000), Ordering::Release);
        self
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::Release);
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.millis.load(Ordering::Acquire);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
