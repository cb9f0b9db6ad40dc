//! Cache-aware series fetch with retry, backoff and a secondary strategy.

use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use super::bars::{InfoMap, PriceSeries};
use super::cache::{normalize_ticker, ResponseCache};
use super::classify::{classify, ErrorClass};
use super::period::Period;
use super::provider::ProviderError;
use super::retry::{NextStep, RetryPolicy};
use super::upstream::Upstream;

/// Metadata lookups get fewer tries than the series itself.
pub const DEFAULT_INFO_RETRIES: u32 = 2;

/// Entries with fewer attributes than this are topped up from the fast-info path.
const MIN_INFO_FIELDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Primary,
    Secondary,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Primary => f.write_str("primary"),
            Strategy::Secondary => f.write_str("secondary"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Data { bars: usize },
    Empty,
    Failed { class: ErrorClass, message: String },
}

/// One outbound series call made while serving a fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchAttempt {
    pub attempt_index: u32,
    pub strategy: Strategy,
    /// Retry backoff slept before this call.
    pub backoff: Duration,
    /// Rate-limiter wait applied before this call.
    pub throttle: Duration,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone)]
pub struct FetchedSeries {
    pub ticker: String,
    pub period: Period,
    pub series: PriceSeries,
    pub info: InfoMap,
    pub from_cache: bool,
    pub attempts: Vec<FetchAttempt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The final attempt ended in an upstream error.
    Exhausted,
    /// Every strategy answered, but with zero rows.
    Empty,
}

/// Terminal outcome of a series fetch. Not retried again within the request.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
    pub attempts: u32,
    pub trace: Vec<FetchAttempt>,
}

enum Fallback {
    Data(PriceSeries),
    Empty,
    Failed(ProviderError),
}

#[derive(Debug, Clone)]
pub struct SeriesFetcher {
    policy: RetryPolicy,
    info_retries: u32,
}

impl SeriesFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            info_retries: DEFAULT_INFO_RETRIES,
        }
    }

    pub fn with_info_retries(mut self, info_retries: u32) -> Self {
        self.info_retries = info_retries.max(1);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Serve `ticker` over `period` from the cache, or fetch and cache it.
    /// A failed fetch leaves the cache untouched.
    pub fn fetch(
        &self,
        upstream: &mut Upstream,
        cache: &mut ResponseCache,
        ticker: &str,
        period: Period,
    ) -> Result<FetchedSeries, FetchFailure> {
        let ticker = normalize_ticker(ticker);

        if let Some(entry) = cache.lookup(&ticker, period, upstream.now()) {
            info!(
                "Serving {} ({}) from cache, {:.0}s old",
                ticker,
                period,
                entry.age_secs(upstream.now())
            );
            return Ok(FetchedSeries {
                ticker,
                period,
                series: entry.series.clone(),
                info: entry.info.clone(),
                from_cache: true,
                attempts: Vec::new(),
            });
        }
        debug!("Cache miss for {} ({})", ticker, period);

        let mut trace = Vec::new();
        let series = self.fetch_with_retry(upstream, &ticker, period, &mut trace)?;
        let info = self.fetch_info(upstream, &ticker);

        let stored = cache.store(&ticker, period, series.clone(), info.clone(), upstream.now());
        if let Err(err) = stored {
            warn!("Failed to persist cache entry for {}: {}", ticker, err);
        }

        Ok(FetchedSeries {
            ticker,
            period,
            series,
            info,
            from_cache: false,
            attempts: trace,
        })
    }

    fn fetch_with_retry(
        &self,
        upstream: &mut Upstream,
        ticker: &str,
        period: Period,
        trace: &mut Vec<FetchAttempt>,
    ) -> Result<PriceSeries, FetchFailure> {
        let mut backoff = Duration::ZERO;
        let mut last_error: Option<String> = None;
        let mut final_kind = FailureKind::Empty;
        let mut attempts = 0;

        for attempt in 0..self.policy.max_retries {
            attempts = attempt + 1;
            if !backoff.is_zero() {
                info!(
                    "Retrying {} in {:.1}s (attempt {}/{})",
                    ticker,
                    backoff.as_secs_f64(),
                    attempts,
                    self.policy.max_retries
                );
                upstream.sleep(backoff);
            }

            let result = upstream.call(|provider| provider.history(ticker, period.code()));
            let throttle = upstream.last_wait();
            let record = |outcome: AttemptOutcome| FetchAttempt {
                attempt_index: attempt,
                strategy: Strategy::Primary,
                backoff,
                throttle,
                outcome,
            };

            let class = match result {
                Ok(series) if !series.is_empty() => {
                    trace.push(record(AttemptOutcome::Data { bars: series.len() }));
                    return Ok(series);
                }
                Ok(_) => {
                    trace.push(record(AttemptOutcome::Empty));
                    debug!("Primary fetch for {} returned no rows", ticker);
                    final_kind = FailureKind::Empty;
                    if self.policy.fallback_on_empty(attempt) {
                        match self.fallback(upstream, ticker, period, attempt, trace) {
                            Fallback::Data(series) => return Ok(series),
                            Fallback::Failed(err) => last_error = Some(err.message().to_string()),
                            Fallback::Empty => {}
                        }
                    }
                    None
                }
                Err(err) => {
                    let class = classify(err.message());
                    warn!(
                        "Primary fetch for {} failed ({}): {}",
                        ticker,
                        class,
                        err.message()
                    );
                    trace.push(record(AttemptOutcome::Failed {
                        class,
                        message: err.message().to_string(),
                    }));
                    final_kind = FailureKind::Exhausted;
                    last_error = Some(err.message().to_string());

                    if class == ErrorClass::AuthExpiry {
                        match self.fallback(upstream, ticker, period, attempt, trace) {
                            Fallback::Data(series) => return Ok(series),
                            Fallback::Failed(err) => last_error = Some(err.message().to_string()),
                            Fallback::Empty => {}
                        }
                    }
                    Some(class)
                }
            };

            match self.policy.next_step(attempt, class) {
                NextStep::Retry { wait } => backoff = wait,
                NextStep::GiveUp => break,
            }
        }

        let message = match (final_kind, last_error) {
            (FailureKind::Exhausted, Some(err)) => {
                format!("Failed after {} attempts: {}", attempts, err)
            }
            (_, Some(err)) => format!(
                "No data for {} ({}) after {} attempts; last error: {}",
                ticker, period, attempts, err
            ),
            (_, None) => format!(
                "No data for {} ({}) after {} attempts",
                ticker, period, attempts
            ),
        };
        warn!("{}", message);

        Err(FetchFailure {
            kind: final_kind,
            message,
            attempts,
            trace: trace.clone(),
        })
    }

    /// Secondary strategy: explicit date window instead of the period shorthand.
    fn fallback(
        &self,
        upstream: &mut Upstream,
        ticker: &str,
        period: Period,
        attempt: u32,
        trace: &mut Vec<FetchAttempt>,
    ) -> Fallback {
        let (start, end) = period.fallback_window(upstream.now());
        info!(
            "Trying secondary download for {} from {} to {}",
            ticker,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );

        let result = upstream.call(|provider| provider.download(ticker, start, end));
        let throttle = upstream.last_wait();
        let (outcome, fallback) = match result {
            Ok(series) if !series.is_empty() => (
                AttemptOutcome::Data { bars: series.len() },
                Fallback::Data(series),
            ),
            Ok(_) => (AttemptOutcome::Empty, Fallback::Empty),
            Err(err) => {
                warn!("Secondary download for {} failed: {}", ticker, err);
                (
                    AttemptOutcome::Failed {
                        class: classify(err.message()),
                        message: err.message().to_string(),
                    },
                    Fallback::Failed(err),
                )
            }
        };

        trace.push(FetchAttempt {
            attempt_index: attempt,
            strategy: Strategy::Secondary,
            backoff: Duration::ZERO,
            throttle,
            outcome,
        });
        fallback
    }

    /// Best-effort company metadata. Never fails; auth or throttling errors
    /// give up immediately with an empty mapping.
    pub fn fetch_info(&self, upstream: &mut Upstream, ticker: &str) -> InfoMap {
        for attempt in 0..self.info_retries {
            if attempt > 0 {
                upstream.sleep(upstream.request_delay().saturating_mul(2));
            }

            match upstream.call(|provider| provider.info(ticker)) {
                Ok(info) if info.len() >= MIN_INFO_FIELDS => return info,
                Ok(info) => {
                    debug!("Sparse company info for {}, using fast info", ticker);
                    return match upstream.call(|provider| provider.fast_info(ticker)) {
                        Ok(fast) => {
                            let mut merged = fast.to_info();
                            merged.extend(info);
                            merged
                        }
                        Err(_) => info,
                    };
                }
                Err(err) => match classify(err.message()) {
                    ErrorClass::AuthExpiry | ErrorClass::RateLimited => {
                        debug!("Skipping company info for {}: {}", ticker, err);
                        return InfoMap::new();
                    }
                    ErrorClass::Transient => {
                        debug!("Company info for {} failed: {}", ticker, err);
                    }
                },
            }
        }

        InfoMap::new()
    }
}
