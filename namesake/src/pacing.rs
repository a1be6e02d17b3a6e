//! Minimum-interval rate limiting for outgoing fetches.
//!
//! A single [`RateLimiter`] is shared (behind an `Arc`) by every fetch path
//! that talks to the same upstream. The policy is a fixed floor: no jitter,
//! no backoff growth.

use parking_lot::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::config::PacingConfig;
use crate::utils::{add_duration, elapsed_between, Clock, Timestamp};

/// Tracks the last fetch time and computes the wait before the next one.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_fetch_at: Mutex<Option<Timestamp>>,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_fetch_at: Mutex::new(None),
        }
    }

    /// Creates a limiter from configuration.
    #[must_use]
    pub fn from_config(config: &PacingConfig) -> Self {
        Self::new(config.min_interval())
    }

    /// The configured minimum interval.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// When the last fetch was recorded, if ever.
    #[must_use]
    pub fn last_fetch_at(&self) -> Option<Timestamp> {
        *self.last_fetch_at.lock()
    }

    /// Returns how long to wait at `now` before a fetch is permitted.
    #[must_use]
    pub fn compute_wait(&self, now: Timestamp) -> Duration {
        self.last_fetch_at
            .lock()
            .map_or(Duration::ZERO, |last| {
                self.min_interval.saturating_sub(elapsed_between(last, now))
            })
    }

    /// Records that a fetch is being issued at `now`.
    pub fn record_fetch(&self, now: Timestamp) {
        *self.last_fetch_at.lock() = Some(now);
    }

    /// Claims the next free fetch slot at or after `now` and returns how
    /// long the caller must wait for it.
    ///
    /// The slot is recorded before returning, so concurrent callers sharing
    /// this limiter are handed slots at least `min_interval` apart.
    pub fn reserve(&self, now: Timestamp) -> Duration {
        let mut last = self.last_fetch_at.lock();
        let slot = last.map_or(now, |prev| add_duration(prev, self.min_interval).max(now));
        *last = Some(slot);
        elapsed_between(now, slot)
    }

    /// Reserves a slot and sleeps on `clock` until it arrives. Returns the
    /// time waited.
    pub async fn acquire(&self, clock: &dyn Clock) -> Duration {
        let wait = self.reserve(clock.now());
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis(), "Waiting for rate limit window");
            clock.sleep(wait).await;
        }
        wait
    }

    /// Forgets the last fetch time.
    pub fn reset(&self) {
        *self.last_fetch_at.lock() = None;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&PacingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TokioClock;
    use crate::utils::{from_epoch_ms, ManualClock};

    #[test]
    fn test_no_wait_before_first_fetch() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.compute_wait(from_epoch_ms(0)), Duration::ZERO);
        assert!(limiter.last_fetch_at().is_none());
    }

    #[test]
    fn test_wait_is_remaining_interval() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        limiter.record_fetch(from_epoch_ms(10_000));

        assert_eq!(
            limiter.compute_wait(from_epoch_ms(10_500)),
            Duration::from_millis(1_500)
        );
        assert_eq!(limiter.compute_wait(from_epoch_ms(12_000)), Duration::ZERO);
        assert_eq!(limiter.compute_wait(from_epoch_ms(20_000)), Duration::ZERO);
    }

    #[test]
    fn test_clock_skew_waits_full_interval() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        limiter.record_fetch(from_epoch_ms(10_000));
        assert_eq!(
            limiter.compute_wait(from_epoch_ms(9_000)),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_reset() {
        let limiter = RateLimiter::default();
        limiter.record_fetch(from_epoch_ms(0));
        limiter.reset();
        assert_eq!(limiter.compute_wait(from_epoch_ms(1)), Duration::ZERO);
    }

    #[test]
    fn test_reserve_hands_out_spaced_slots() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        let now = from_epoch_ms(10_000);

        assert_eq!(limiter.reserve(now), Duration::ZERO);
        assert_eq!(limiter.reserve(now), Duration::from_secs(2));
        assert_eq!(limiter.reserve(now), Duration::from_secs(4));
        assert_eq!(limiter.last_fetch_at(), Some(from_epoch_ms(14_000)));
    }

    #[tokio::test]
    async fn test_acquire_sleeps_on_clock() {
        let clock = ManualClock::at_epoch_ms(5_000);
        let limiter = RateLimiter::new(Duration::from_secs(2));

        assert_eq!(limiter.acquire(&clock).await, Duration::ZERO);

        clock.advance_ms(300);
        assert_eq!(limiter.acquire(&clock).await, Duration::from_millis(1_700));
        assert_eq!(clock.recorded_sleeps(), vec![Duration::from_millis(1_700)]);
        assert_eq!(limiter.last_fetch_at(), Some(clock.now()));
    }

    #[test]
    fn test_acquire_spaces_consecutive_fetches() {
        let clock = ManualClock::at_epoch_ms(0);
        let limiter = RateLimiter::default();

        tokio_test::block_on(async {
            limiter.acquire(&clock).await;
            let first = limiter.last_fetch_at().unwrap();
            limiter.acquire(&clock).await;
            let second = limiter.last_fetch_at().unwrap();
            assert!(elapsed_between(first, second) >= Duration::from_secs(2));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquires_keep_the_floor() {
        let clock = TokioClock::starting_at(from_epoch_ms(1_000_000));
        let limiter = RateLimiter::new(Duration::from_millis(500));
        limiter.acquire(&clock).await;

        let (limiter, clock) = (&limiter, &clock);
        let stamp = || async move {
            limiter.acquire(clock).await;
            tokio::time::Instant::now()
        };
        let (a, b) = tokio::join!(stamp(), stamp());

        let gap = if a > b { a - b } else { b - a };
        assert!(gap >= Duration::from_millis(500), "floor violated: {gap:?}");
    }
}
