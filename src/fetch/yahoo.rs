//! Yahoo Finance implementation of [`MarketDataProvider`].
//!
//! Series come from the v8 chart API, quotes from the v7 quote API and
//! company attributes from the v10 quote summary modules. Endpoints are
//! configurable templates so a mirror or proxy can be substituted.

use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use super::bars::{Bar, FastInfo, InfoMap, PriceSeries};
use super::clock::Clock;
use super::decode::{error_description, first_of, flatten_modules, json_f64, json_string};
use super::period::fallback_window_for_code;
use super::provider::{MarketDataProvider, ProviderError, ProviderResult};
use super::request::{build_client, render_template};
use crate::config::ProviderSettings;
use crate::error::Result;

/// Range codes the chart endpoint accepts natively. Anything else is sent as
/// an explicit `period1`/`period2` window.
const NATIVE_RANGES: [&str; 11] = [
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "10y", "ytd", "max",
];

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
    #[serde(default)]
    events: ChartEvents,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
    adjclose: Option<Vec<AdjCloseColumn>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseColumn {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: HashMap<String, DividendEvent>,
    #[serde(default)]
    splits: HashMap<String, SplitEvent>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct SplitEvent {
    date: i64,
    numerator: f64,
    denominator: f64,
}

pub struct YahooProvider {
    client: Client,
    settings: ProviderSettings,
    clock: Rc<dyn Clock>,
}

impl YahooProvider {
    /// `clock` anchors the windows built for ranges the chart API lacks.
    pub fn new(settings: &ProviderSettings, clock: Rc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            client: build_client(settings)?,
            settings: settings.clone(),
            clock,
        })
    }

    fn get_json(&self, template: &str, ticker: &str, query: &[(&str, String)]) -> ProviderResult<Value> {
        let url = render_template(template, &[("symbol", ticker)])
            .map_err(|err| ProviderError::new(err.to_string()))?;
        log::debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send()?;
        let status = response.status();
        let body = response.text()?;
        let root: Option<Value> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            // A chart "Not Found" body is answered with 404 but still decodes.
            if let Some(root) = root.as_ref().filter(|root| is_not_found(root)) {
                return Ok(root.clone());
            }
            let detail = root
                .as_ref()
                .and_then(error_description)
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(ProviderError::new(format!("{status}: {detail}")));
        }

        root.ok_or_else(|| {
            ProviderError::new(format!("Malformed JSON from market-data provider for {ticker}"))
        })
    }

    fn chart(&self, ticker: &str, query: Vec<(&str, String)>) -> ProviderResult<PriceSeries> {
        let root = self.get_json(&self.settings.chart_url, ticker, &query)?;
        parse_chart(ticker, root)
    }

    fn chart_window(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: &str,
    ) -> ProviderResult<PriceSeries> {
        self.chart(ticker, window_query(start, end, interval))
    }
}

fn window_query(start: DateTime<Utc>, end: DateTime<Utc>, interval: &str) -> Vec<(&'static str, String)> {
    vec![
        ("period1", start.timestamp().to_string()),
        ("period2", end.timestamp().to_string()),
        ("interval", interval.to_string()),
        ("events", "div,splits".to_string()),
        ("includeAdjustedClose", "true".to_string()),
    ]
}

/// Chart query for a period code. Native codes go out as `range`; the rest
/// become a window ending at `now`.
fn history_query(period_code: &str, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
    let interval = if period_code == "1d" { "5m" } else { "1d" };
    if !NATIVE_RANGES.contains(&period_code) {
        let (start, end) = fallback_window_for_code(period_code, now);
        return window_query(start, end, interval);
    }
    vec![
        ("range", period_code.to_string()),
        ("interval", interval.to_string()),
        ("events", "div,splits".to_string()),
        ("includeAdjustedClose", "true".to_string()),
    ]
}

impl MarketDataProvider for YahooProvider {
    fn history(&self, ticker: &str, period_code: &str) -> ProviderResult<PriceSeries> {
        self.chart(ticker, history_query(period_code, self.clock.now()))
    }

    fn download(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<PriceSeries> {
        self.chart_window(ticker, start, end, "1d")
    }

    fn history_range(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<PriceSeries> {
        self.chart_window(ticker, start, end, "1d")
    }

    fn intraday(&self, ticker: &str) -> ProviderResult<PriceSeries> {
        self.chart(
            ticker,
            vec![
                ("range", "1d".to_string()),
                ("interval", "1m".to_string()),
            ],
        )
    }

    fn fast_info(&self, ticker: &str) -> ProviderResult<FastInfo> {
        let root = self.get_json(&self.settings.quote_url, ticker, &[])?;
        parse_quote(ticker, &root)
    }

    fn info(&self, ticker: &str) -> ProviderResult<InfoMap> {
        let root = self.get_json(&self.settings.profile_url, ticker, &[])?;
        parse_profile(ticker, &root)
    }
}

fn is_not_found(root: &Value) -> bool {
    root.pointer("/chart/error/code")
        .and_then(Value::as_str)
        .map(|code| code.eq_ignore_ascii_case("Not Found"))
        .unwrap_or(false)
}

/// Decode a chart payload. Multi-symbol results are narrowed to `ticker`;
/// an unknown symbol yields an empty series rather than an error.
fn parse_chart(ticker: &str, root: Value) -> ProviderResult<PriceSeries> {
    let response: ChartResponse = serde_json::from_value(root).map_err(|err| {
        ProviderError::new(format!("Unexpected chart payload for {ticker}: {err}"))
    })?;

    if let Some(error) = response.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Ok(PriceSeries::default());
        }
        return Err(ProviderError::new(format!(
            "{}: {}",
            error.code, error.description
        )));
    }

    let mut results = response.chart.result.unwrap_or_default();
    let position = results
        .iter()
        .position(|data| {
            data.meta
                .symbol
                .as_deref()
                .map(|symbol| symbol.eq_ignore_ascii_case(ticker))
                .unwrap_or(false)
        })
        .unwrap_or(0);
    if results.is_empty() {
        return Ok(PriceSeries::default());
    }
    Ok(bars_from_chart(results.swap_remove(position)))
}

fn bars_from_chart(data: ChartData) -> PriceSeries {
    let Some(timestamps) = data.timestamp else {
        return PriceSeries::default();
    };
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = data
        .indicators
        .adjclose
        .and_then(|columns| columns.into_iter().next())
        .map(|column| column.adjclose);

    let column = |values: &[Option<f64>], index: usize| values.get(index).copied().flatten();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (index, &ts) in timestamps.iter().enumerate() {
        let Some(close) = column(&quote.close, index) else {
            continue;
        };
        let Some(timestamp) = Utc.timestamp_opt(ts, 0).single() else {
            continue;
        };

        bars.push(Bar {
            timestamp,
            open: column(&quote.open, index).unwrap_or(close),
            high: column(&quote.high, index).unwrap_or(close),
            low: column(&quote.low, index).unwrap_or(close),
            close,
            volume: column(&quote.volume, index).unwrap_or(0.0),
            dividends: 0.0,
            stock_splits: 0.0,
            adj_close: adjclose.as_deref().and_then(|values| column(values, index)),
        });
    }

    for event in data.events.dividends.values() {
        if let Some(index) = event_bar(&bars, event.date) {
            bars[index].dividends += event.amount;
        }
    }
    for event in data.events.splits.values() {
        if event.denominator == 0.0 {
            continue;
        }
        if let Some(index) = event_bar(&bars, event.date) {
            bars[index].stock_splits = event.numerator / event.denominator;
        }
    }

    PriceSeries::new(bars)
}

/// The bar an event belongs to: the one stamped with the event's epoch, or
/// else the first bar of the event's UTC day. Intraday series carry several
/// bars per day and only one of them may hold the event.
fn event_bar(bars: &[Bar], epoch: i64) -> Option<usize> {
    if let Some(index) = bars.iter().position(|bar| bar.timestamp.timestamp() == epoch) {
        return Some(index);
    }
    let day = Utc.timestamp_opt(epoch, 0).single()?.date_naive();
    bars.iter().position(|bar| bar.timestamp.date_naive() == day)
}

fn parse_quote(ticker: &str, root: &Value) -> ProviderResult<FastInfo> {
    let entry = root
        .pointer("/quoteResponse/result")
        .and_then(Value::as_array)
        .and_then(|results| {
            results
                .iter()
                .find(|item| {
                    item.get("symbol")
                        .and_then(Value::as_str)
                        .map(|symbol| symbol.eq_ignore_ascii_case(ticker))
                        .unwrap_or(false)
                })
                .or_else(|| results.first())
        })
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::new(format!("No quote returned for {ticker}")))?;

    let number = |keys: &[&str]| first_of(entry, keys).and_then(json_f64);
    let text = |keys: &[&str]| first_of(entry, keys).and_then(json_string);

    Ok(FastInfo {
        currency: text(&["currency", "financialCurrency"]),
        exchange: text(&["fullExchangeName", "exchange"]),
        quote_type: text(&["quoteType"]),
        timezone: text(&["exchangeTimezoneName", "exchangeTimezoneShortName"]),
        last_price: number(&["regularMarketPrice", "postMarketPrice"]),
        previous_close: number(&["regularMarketPreviousClose", "previousClose"]),
        open: number(&["regularMarketOpen", "open"]),
        day_high: number(&["regularMarketDayHigh", "dayHigh"]),
        day_low: number(&["regularMarketDayLow", "dayLow"]),
        last_volume: number(&["regularMarketVolume", "volume"]),
    })
}

fn parse_profile(ticker: &str, root: &Value) -> ProviderResult<InfoMap> {
    if let Some(detail) = error_description(root) {
        return Err(ProviderError::new(detail));
    }
    let modules = root
        .pointer("/quoteSummary/result/0")
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::new(format!("No profile returned for {ticker}")))?;
    Ok(flatten_modules(modules))
}
