//! Resilient market-data access: pacing, retries, caching and the
//! Yahoo-backed provider behind them.

pub mod bars;
pub mod cache;
pub mod classify;
pub mod clock;
pub mod decode;
pub mod period;
pub mod provider;
pub mod quote;
pub mod rate_limit;
pub mod request;
pub mod retry;
pub mod series;
pub mod upstream;
pub mod variation;
pub mod yahoo;

pub use bars::{Bar, BarField, FastInfo, InfoMap, PriceSeries};
pub use cache::{CacheEntry, CacheStatus, ResponseCache, CACHE_TTL};
pub use classify::{classify, ErrorClass};
pub use clock::{Clock, ManualClock, SystemClock};
pub use period::Period;
pub use provider::{MarketDataProvider, ProviderError, ProviderResult};
pub use quote::{Quote, QuoteFetcher, QuoteSource, QUOTE_DELAY_LABEL};
pub use rate_limit::RateLimiter;
pub use retry::{NextStep, RetryPolicy};
pub use series::{
    AttemptOutcome, FailureKind, FetchAttempt, FetchFailure, FetchedSeries, SeriesFetcher,
    Strategy,
};
pub use upstream::Upstream;
pub use variation::{Variation, VariationCalculator, VariationError};
pub use yahoo::YahooProvider;
