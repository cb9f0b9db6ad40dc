use std::time::Duration;

use chrono::{DateTime, Utc};

use super::clock::{seconds_between, Clock};

/// Process-wide minimum spacing between outbound calls.
///
/// Holds a single timestamp and assumes one caller at a time; callers block
/// until the spacing is satisfied and requests are never dropped.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    delay: Duration,
    last_request_at: Option<DateTime<Utc>>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request_at: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn last_request_at(&self) -> Option<DateTime<Utc>> {
        self.last_request_at
    }

    /// Block until `delay` has passed since the previous call, then stamp the
    /// permitted call. Returns the wait applied.
    pub fn wait_if_needed(&mut self, clock: &dyn Clock) -> Duration {
        let wait = self.pending_wait(clock.now());
        if !wait.is_zero() {
            log::debug!(
                "Rate limiter holding request for {:.2}s",
                wait.as_secs_f64()
            );
            clock.sleep(wait);
        }
        self.last_request_at = Some(clock.now());
        wait
    }

    fn pending_wait(&self, now: DateTime<Utc>) -> Duration {
        let Some(last) = self.last_request_at else {
            return Duration::ZERO;
        };
        let elapsed = seconds_between(last, now).max(0.0);
        let required = self.delay.as_secs_f64();
        if elapsed < required {
            Duration::from_secs_f64(required - elapsed)
        } else {
            Duration::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::clock::ManualClock;
    use chrono::TimeZone;

    fn clock() -> ManualClock {
        ManualClock::starting_at(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap())
    }

    #[test]
    fn first_call_is_not_delayed() {
        let clock = clock();
        let mut limiter = RateLimiter::new(Duration::from_secs(2));

        assert_eq!(limiter.wait_if_needed(&clock), Duration::ZERO);
        assert_eq!(limiter.last_request_at(), Some(clock.now()));
    }

    #[test]
    fn back_to_back_calls_wait_out_the_remainder() {
        let clock = clock();
        let mut limiter = RateLimiter::new(Duration::from_secs(2));

        limiter.wait_if_needed(&clock);
        clock.advance(Duration::from_millis(500));
        let waited = limiter.wait_if_needed(&clock);

        assert_eq!(waited, Duration::from_millis(1500));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(1500)]);
    }

    #[test]
    fn stamps_after_waiting() {
        let clock = clock();
        let mut limiter = RateLimiter::new(Duration::from_secs(2));

        limiter.wait_if_needed(&clock);
        let first = limiter.last_request_at().unwrap();
        limiter.wait_if_needed(&clock);
        let second = limiter.last_request_at().unwrap();

        assert!(seconds_between(first, second) >= 2.0);
    }

    #[test]
    fn idle_gap_longer_than_delay_passes_through() {
        let clock = clock();
        let mut limiter = RateLimiter::new(Duration::from_secs(2));

        limiter.wait_if_needed(&clock);
        clock.advance(Duration::from_secs(5));

        assert_eq!(limiter.wait_if_needed(&clock), Duration::ZERO);
        assert!(clock.sleeps().is_empty());
    }
}
