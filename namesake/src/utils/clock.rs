//! Injectable time source.
//!
//! The rate limiter and cache read time only through a [`Clock`], so tests
//! can drive them with a [`ManualClock`] instead of waiting in real time.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::time::Duration;

/// Represents a point in time.
pub type Timestamp = DateTime<Utc>;

/// Source of the current time and of asynchronous waits.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;

    /// Suspends for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time with tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A clock that only moves when told to.
///
/// `sleep` returns immediately after advancing the clock by the requested
/// duration, and every requested sleep is recorded.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Creates a clock frozen at the given Unix time in milliseconds.
    #[must_use]
    pub fn at_epoch_ms(ms: i64) -> Self {
        Self::new(from_epoch_ms(ms))
    }

    /// Moves the clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now = add_duration(*now, duration);
    }

    /// Moves the clock forward by milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Sets the clock to an absolute time.
    pub fn set(&self, at: Timestamp) {
        *self.now.lock() = at;
    }

    /// Returns every duration passed to `sleep`, in call order.
    #[must_use]
    pub fn recorded_sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at_epoch_ms(0)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        self.advance(duration);
    }
}

/// Returns the Unix time of a timestamp in milliseconds.
#[must_use]
pub fn epoch_ms(at: Timestamp) -> i64 {
    at.timestamp_millis()
}

/// Builds a timestamp from Unix milliseconds, clamping out-of-range input to the epoch.
#[must_use]
pub fn from_epoch_ms(ms: i64) -> Timestamp {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Time elapsed from `earlier` to `later`; zero if `later` is not after `earlier`.
#[must_use]
pub fn elapsed_between(earlier: Timestamp, later: Timestamp) -> Duration {
    (later - earlier).to_std().unwrap_or(Duration::ZERO)
}

/// `at` shifted forward by `duration`, saturating at `at` on overflow.
#[must_use]
pub fn add_duration(at: Timestamp, duration: Duration) -> Timestamp {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at_epoch_ms(1_000);
        clock.advance_ms(500);
        assert_eq!(epoch_ms(clock.now()), 1_500);
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_is_recorded() {
        let clock = ManualClock::default();
        clock.sleep(Duration::from_millis(250)).await;
        clock.sleep(Duration::from_secs(1)).await;

        assert_eq!(epoch_ms(clock.now()), 1_250);
        assert_eq!(
            clock.recorded_sleeps(),
            vec![Duration::from_millis(250), Duration::from_secs(1)]
        );
    }

    #[test]
    fn test_elapsed_between_never_negative() {
        let a = from_epoch_ms(2_000);
        let b = from_epoch_ms(500);
        assert_eq!(elapsed_between(a, b), Duration::ZERO);
        assert_eq!(elapsed_between(b, a), Duration::from_millis(1_500));
    }

    #[test]
    fn test_system_clock_is_current() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
    }
}
