//! Scripted provider and manual clock shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use stock_watch::fetch::{
    Bar, Clock, FastInfo, InfoMap, ManualClock, MarketDataProvider, PriceSeries, ProviderError,
    ProviderResult, Upstream,
};

pub const REQUEST_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    History,
    Download,
    HistoryRange,
    Intraday,
    FastInfo,
    Info,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub op: Op,
    pub ticker: String,
    pub at: DateTime<Utc>,
    /// Date window for the bounded operations.
    pub window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Queued responses per operation. An exhausted queue falls back to a
/// per-operation default: empty series, empty info, or an error for the
/// quote paths.
#[derive(Default)]
pub struct Script {
    calls: RefCell<Vec<Call>>,
    history: RefCell<VecDeque<ProviderResult<PriceSeries>>>,
    download: RefCell<VecDeque<ProviderResult<PriceSeries>>>,
    history_range: RefCell<VecDeque<ProviderResult<PriceSeries>>>,
    intraday: RefCell<VecDeque<ProviderResult<PriceSeries>>>,
    fast_info: RefCell<VecDeque<ProviderResult<FastInfo>>>,
    info: RefCell<VecDeque<ProviderResult<InfoMap>>>,
}

impl Script {
    pub fn history(&self, response: ProviderResult<PriceSeries>) -> &Self {
        self.history.borrow_mut().push_back(response);
        self
    }

    pub fn download(&self, response: ProviderResult<PriceSeries>) -> &Self {
        self.download.borrow_mut().push_back(response);
        self
    }

    pub fn history_range(&self, response: ProviderResult<PriceSeries>) -> &Self {
        self.history_range.borrow_mut().push_back(response);
        self
    }

    pub fn intraday(&self, response: ProviderResult<PriceSeries>) -> &Self {
        self.intraday.borrow_mut().push_back(response);
        self
    }

    pub fn fast_info(&self, response: ProviderResult<FastInfo>) -> &Self {
        self.fast_info.borrow_mut().push_back(response);
        self
    }

    pub fn info(&self, response: ProviderResult<InfoMap>) -> &Self {
        self.info.borrow_mut().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.calls.borrow().iter().map(|call| call.op).collect()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls.borrow().iter().filter(|call| call.op == op).count()
    }
}

pub struct ScriptedProvider {
    script: Rc<Script>,
    clock: Rc<ManualClock>,
}

impl ScriptedProvider {
    fn record(&self, op: Op, ticker: &str, window: Option<(DateTime<Utc>, DateTime<Utc>)>) {
        self.script.calls.borrow_mut().push(Call {
            op,
            ticker: ticker.to_string(),
            at: self.clock.now(),
            window,
        });
    }
}

fn next_or<T>(queue: &RefCell<VecDeque<ProviderResult<T>>>, default: ProviderResult<T>) -> ProviderResult<T> {
    queue.borrow_mut().pop_front().unwrap_or(default)
}

impl MarketDataProvider for ScriptedProvider {
    fn history(&self, ticker: &str, _period_code: &str) -> ProviderResult<PriceSeries> {
        self.record(Op::History, ticker, None);
        next_or(&self.script.history, Ok(PriceSeries::default()))
    }

    fn download(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<PriceSeries> {
        self.record(Op::Download, ticker, Some((start, end)));
        next_or(&self.script.download, Ok(PriceSeries::default()))
    }

    fn history_range(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<PriceSeries> {
        self.record(Op::HistoryRange, ticker, Some((start, end)));
        next_or(&self.script.history_range, Ok(PriceSeries::default()))
    }

    fn intraday(&self, ticker: &str) -> ProviderResult<PriceSeries> {
        self.record(Op::Intraday, ticker, None);
        next_or(
            &self.script.intraday,
            Err(ProviderError::new("intraday unavailable")),
        )
    }

    fn fast_info(&self, ticker: &str) -> ProviderResult<FastInfo> {
        self.record(Op::FastInfo, ticker, None);
        next_or(
            &self.script.fast_info,
            Err(ProviderError::new("fast info unavailable")),
        )
    }

    fn info(&self, ticker: &str) -> ProviderResult<InfoMap> {
        self.record(Op::Info, ticker, None);
        next_or(&self.script.info, Ok(InfoMap::new()))
    }
}

pub struct Harness {
    pub clock: Rc<ManualClock>,
    pub script: Rc<Script>,
    pub upstream: Upstream,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0).unwrap()
}

pub fn harness() -> Harness {
    let clock = Rc::new(ManualClock::starting_at(start_time()));
    let script = Rc::new(Script::default());
    let (provider, shared_clock) = provider_parts(&clock, &script);
    Harness {
        upstream: Upstream::new(provider, shared_clock, REQUEST_DELAY),
        clock,
        script,
    }
}

/// Provider and clock handles for building an `Upstream` or `AppState`.
pub fn provider_parts(
    clock: &Rc<ManualClock>,
    script: &Rc<Script>,
) -> (Box<dyn MarketDataProvider>, Rc<dyn Clock>) {
    let provider = ScriptedProvider {
        script: Rc::clone(script),
        clock: Rc::clone(clock),
    };
    let shared: Rc<dyn Clock> = clock.clone();
    (Box::new(provider), shared)
}

/// Daily bars with the given closes, starting 2024-05-01.
pub fn series(closes: &[f64]) -> PriceSeries {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    PriceSeries::new(
        closes
            .iter()
            .enumerate()
            .map(|(day, close)| Bar {
                timestamp: start + chrono::Duration::days(day as i64),
                open: *close,
                high: close + 1.0,
                low: close - 1.0,
                close: *close,
                volume: 1_000.0,
                dividends: 0.0,
                stock_splits: 0.0,
                adj_close: None,
            })
            .collect(),
    )
}

pub fn fail<T>(message: &str) -> ProviderResult<T> {
    Err(ProviderError::new(message))
}
