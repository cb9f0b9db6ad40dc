use chrono::Duration;
use log::debug;
use thiserror::Error;

use super::bars::PriceSeries;
use super::cache::normalize_ticker;
use super::upstream::Upstream;

/// Extra calendar days requested so weekends and holidays don't starve the window.
pub const LOOKBACK_MARGIN_DAYS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variation {
    pub percent: f64,
    pub latest_price: f64,
    pub bars: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VariationError {
    #[error("need at least 2 bars, got {bars}")]
    InsufficientHistory { bars: usize },
    #[error("first close is zero")]
    ZeroBasePrice,
    #[error("lookback of {days} days is out of range")]
    InvalidWindow { days: u32 },
    #[error("provider error: {0}")]
    Provider(String),
}

/// Percentage change of the close over a trailing window of calendar days.
#[derive(Debug, Clone, Default)]
pub struct VariationCalculator;

impl VariationCalculator {
    pub fn new() -> Self {
        Self
    }

    /// `(percent, latest_price)`, or `(None, None)` for any failure.
    pub fn percent_change(
        &self,
        upstream: &mut Upstream,
        ticker: &str,
        lookback_days: u32,
    ) -> (Option<f64>, Option<f64>) {
        match self.percent_change_detailed(upstream, ticker, lookback_days) {
            Ok(variation) => (Some(variation.percent), Some(variation.latest_price)),
            Err(err) => {
                debug!(
                    "Variation over {}d for {} unavailable: {}",
                    lookback_days, ticker, err
                );
                (None, None)
            }
        }
    }

    /// Same computation, keeping the reason for a missing result.
    pub fn percent_change_detailed(
        &self,
        upstream: &mut Upstream,
        ticker: &str,
        lookback_days: u32,
    ) -> Result<Variation, VariationError> {
        let ticker = normalize_ticker(ticker);
        let end = upstream.now();
        let start = Duration::try_days(i64::from(lookback_days) + LOOKBACK_MARGIN_DAYS)
            .and_then(|window| end.checked_sub_signed(window))
            .ok_or(VariationError::InvalidWindow {
                days: lookback_days,
            })?;

        let series = upstream
            .call(|provider| provider.history_range(&ticker, start, end))
            .map_err(|err| VariationError::Provider(err.message().to_string()))?;

        compute_variation(&series)
    }
}

/// `(last_close - first_close) / first_close * 100` over the whole series.
pub fn compute_variation(series: &PriceSeries) -> Result<Variation, VariationError> {
    let (first, last) = match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() >= 2 => (first, last),
        _ => {
            return Err(VariationError::InsufficientHistory {
                bars: series.len(),
            })
        }
    };

    if first.close == 0.0 {
        return Err(VariationError::ZeroBasePrice);
    }

    Ok(Variation {
        percent: (last.close - first.close) / first.close * 100.0,
        latest_price: last.close,
        bars: series.len(),
    })
}
