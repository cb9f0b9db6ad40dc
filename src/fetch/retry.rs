//! Retry budget and backoff schedule for one logical series fetch.

use std::time::Duration;

use super::classify::ErrorClass;

/// Default number of primary-strategy attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Exponent bump applied on top of the attempt index for throttled failures.
const RATE_LIMIT_EXPONENT_BUMP: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Base unit of every wait; the same value paces the rate limiter.
    pub request_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            request_delay: Duration::from_secs(2),
        }
    }
}

/// What the fetcher does after a failed or empty primary attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Sleep, then run the primary strategy again.
    Retry { wait: Duration },
    /// Budget exhausted.
    GiveUp,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, request_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            request_delay,
        }
    }

    pub fn is_last_attempt(&self, attempt: u32) -> bool {
        attempt + 1 >= self.max_retries
    }

    /// Plain exponential wait before attempt `attempt` (`request_delay × 2^attempt`).
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.scaled(attempt)
    }

    /// Wait before the attempt that follows a throttled failure at `failed_attempt`.
    pub fn rate_limit_backoff_after(&self, failed_attempt: u32) -> Duration {
        self.scaled(failed_attempt + RATE_LIMIT_EXPONENT_BUMP)
    }

    /// Whether an empty-but-successful primary response earns a secondary try.
    /// Only the first and final attempts do.
    pub fn fallback_on_empty(&self, attempt: u32) -> bool {
        attempt == 0 || self.is_last_attempt(attempt)
    }

    /// Decide the step after attempt `attempt` ended without data. `class` is
    /// `None` for an empty response.
    pub fn next_step(&self, attempt: u32, class: Option<ErrorClass>) -> NextStep {
        if self.is_last_attempt(attempt) {
            return NextStep::GiveUp;
        }
        let wait = match class {
            Some(ErrorClass::RateLimited) => self.rate_limit_backoff_after(attempt),
            _ => self.backoff_before(attempt + 1),
        };
        NextStep::Retry { wait }
    }

    fn scaled(&self, exponent: u32) -> Duration {
        let factor = 2u32.saturating_pow(exponent);
        self.request_delay.saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(2))
    }

    #[test]
    fn generic_backoff_doubles_per_attempt() {
        let policy = policy();
        assert_eq!(policy.backoff_before(0), Duration::ZERO);
        assert_eq!(policy.backoff_before(1), Duration::from_secs(4));
        assert_eq!(policy.backoff_before(2), Duration::from_secs(8));
    }

    #[test]
    fn throttled_backoff_is_steeper() {
        let policy = policy();
        assert_eq!(policy.rate_limit_backoff_after(0), Duration::from_secs(8));
        assert_eq!(policy.rate_limit_backoff_after(1), Duration::from_secs(16));
        assert_eq!(
            policy.next_step(0, Some(ErrorClass::RateLimited)),
            NextStep::Retry {
                wait: Duration::from_secs(8)
            }
        );
        assert_eq!(
            policy.next_step(1, Some(ErrorClass::Transient)),
            NextStep::Retry {
                wait: Duration::from_secs(8)
            }
        );
    }

    #[test]
    fn last_attempt_gives_up() {
        let policy = policy();
        assert_eq!(policy.next_step(2, None), NextStep::GiveUp);
        assert_eq!(
            policy.next_step(2, Some(ErrorClass::RateLimited)),
            NextStep::GiveUp
        );
    }

    #[test]
    fn empty_fallback_only_on_edges() {
        let policy = policy();
        assert!(policy.fallback_on_empty(0));
        assert!(!policy.fallback_on_empty(1));
        assert!(policy.fallback_on_empty(2));
    }

    #[test]
    fn zero_budget_is_clamped_to_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_secs(2));
        assert_eq!(policy.max_retries, 1);
        assert!(policy.is_last_attempt(0));
    }
}
