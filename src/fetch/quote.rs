use chrono::{DateTime, Duration, Utc};
use log::debug;

use super::bars::PriceSeries;
use super::cache::normalize_ticker;
use super::upstream::Upstream;
use crate::utils::Currency;

/// Fixed disclaimer attached to every quote. It is not a measured latency.
pub const QUOTE_DELAY_LABEL: &str = "Data delayed ~10 minutes";

const ASSUMED_DELAY_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
    FastInfo,
    Intraday,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    pub previous_close: f64,
    pub open: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub volume: f64,
    pub as_of: DateTime<Utc>,
    pub currency: Currency,
    pub source: QuoteSource,
    pub delay_label: &'static str,
}

impl Quote {
    pub fn change(&self) -> f64 {
        self.price - self.previous_close
    }

    pub fn change_percent(&self) -> f64 {
        if self.previous_close == 0.0 {
            0.0
        } else {
            self.change() / self.previous_close * 100.0
        }
    }
}

/// Best-effort current quote: metadata path first, then today's intraday bars.
/// No retries, and failures are silent.
#[derive(Debug, Clone, Default)]
pub struct QuoteFetcher;

impl QuoteFetcher {
    pub fn new() -> Self {
        Self
    }

    pub fn get_current_quote(&self, upstream: &mut Upstream, ticker: &str) -> Option<Quote> {
        let ticker = normalize_ticker(ticker);
        let currency = Currency::for_ticker(&ticker);

        match upstream.call(|provider| provider.fast_info(&ticker)) {
            Ok(fast) => {
                if let Some(price) = fast.last_price {
                    let open = fast.open.unwrap_or(price);
                    return Some(Quote {
                        previous_close: fast.previous_close.unwrap_or(open),
                        open,
                        day_high: fast.day_high.unwrap_or(price),
                        day_low: fast.day_low.unwrap_or(price),
                        volume: fast.last_volume.unwrap_or(0.0),
                        as_of: upstream.now() - Duration::minutes(ASSUMED_DELAY_MINUTES),
                        price,
                        ticker,
                        currency,
                        source: QuoteSource::FastInfo,
                        delay_label: QUOTE_DELAY_LABEL,
                    });
                }
                debug!("Fast info for {} has no last price", ticker);
            }
            Err(err) => debug!("Fast info for {} failed: {}", ticker, err),
        }

        match upstream.call(|provider| provider.intraday(&ticker)) {
            Ok(series) => quote_from_intraday(ticker, currency, &series),
            Err(err) => {
                debug!("Intraday quote fallback for {} failed: {}", ticker, err);
                None
            }
        }
    }
}

/// Derive a quote from the session's bars: last close, first open, extremes and total volume.
pub fn quote_from_intraday(
    ticker: String,
    currency: Currency,
    series: &PriceSeries,
) -> Option<Quote> {
    let first = series.first()?;
    let last = series.last()?;
    let bars = series.bars();

    Some(Quote {
        price: last.close,
        previous_close: first.open,
        open: first.open,
        day_high: bars.iter().map(|bar| bar.high).fold(f64::MIN, f64::max),
        day_low: bars.iter().map(|bar| bar.low).fold(f64::MAX, f64::min),
        volume: bars.iter().map(|bar| bar.volume).sum(),
        as_of: last.timestamp,
        ticker,
        currency,
        source: QuoteSource::Intraday,
        delay_label: QUOTE_DELAY_LABEL,
    })
}
