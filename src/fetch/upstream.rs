use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::clock::Clock;
use super::provider::{MarketDataProvider, ProviderResult};
use super::rate_limit::RateLimiter;

/// Shared substrate for outbound calls: the provider, the clock every wait
/// goes through, and the single process-wide rate limiter.
pub struct Upstream {
    provider: Box<dyn MarketDataProvider>,
    clock: Rc<dyn Clock>,
    limiter: RateLimiter,
    last_wait: Duration,
}

impl Upstream {
    pub fn new(
        provider: Box<dyn MarketDataProvider>,
        clock: Rc<dyn Clock>,
        request_delay: Duration,
    ) -> Self {
        Self {
            provider,
            clock,
            limiter: RateLimiter::new(request_delay),
            last_wait: Duration::ZERO,
        }
    }

    /// Issue one provider call once the rate limiter allows it.
    pub fn call<T, F>(&mut self, op: F) -> ProviderResult<T>
    where
        F: FnOnce(&dyn MarketDataProvider) -> ProviderResult<T>,
    {
        self.last_wait = self.limiter.wait_if_needed(self.clock.as_ref());
        op(self.provider.as_ref())
    }

    /// Rate-limit wait applied to the most recent call.
    pub fn last_wait(&self) -> Duration {
        self.last_wait
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration);
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn request_delay(&self) -> Duration {
        self.limiter.delay()
    }
}
