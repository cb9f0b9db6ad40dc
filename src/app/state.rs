use std::rc::Rc;

use crate::config::Settings;
use crate::error::{Context, Result};
use crate::fetch::{
    CacheStatus, Clock, FetchFailure, FetchedSeries, MarketDataProvider, Period, Quote,
    QuoteFetcher, ResponseCache, SeriesFetcher, SystemClock, Upstream, Variation,
    VariationCalculator, VariationError, YahooProvider,
};
use crate::records::Watchlist;

use super::report::{build_report, ComparativeReport};

/// Process-wide runtime: one upstream (and so one rate limiter), one cache
/// and the watchlist document.
pub struct AppState {
    settings: Settings,
    upstream: Upstream,
    cache: ResponseCache,
    series: SeriesFetcher,
    quotes: QuoteFetcher,
    variations: VariationCalculator,
    watchlist: Watchlist,
}

impl AppState {
    /// Runtime backed by the configured Yahoo endpoints and the wall clock.
    pub fn open(settings: Settings) -> Result<Self> {
        let clock: Rc<dyn Clock> = Rc::new(SystemClock);
        let provider = YahooProvider::new(&settings.provider, Rc::clone(&clock))
            .context("Failed to initialise market-data provider")?;
        Self::with_provider(settings, Box::new(provider), clock)
    }

    pub fn with_provider(
        settings: Settings,
        provider: Box<dyn MarketDataProvider>,
        clock: Rc<dyn Clock>,
    ) -> Result<Self> {
        let cache = ResponseCache::load(settings.cache_file.clone())?;
        let watchlist = Watchlist::load(&settings.data_file)?;
        let upstream = Upstream::new(provider, clock, settings.request_delay);

        Ok(Self {
            series: settings.series_fetcher(),
            quotes: QuoteFetcher::new(),
            variations: VariationCalculator::new(),
            settings,
            upstream,
            cache,
            watchlist,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    pub fn fetch_series(
        &mut self,
        ticker: &str,
        period: Period,
    ) -> std::result::Result<FetchedSeries, FetchFailure> {
        self.series
            .fetch(&mut self.upstream, &mut self.cache, ticker, period)
    }

    pub fn quote(&mut self, ticker: &str) -> Option<Quote> {
        self.quotes.get_current_quote(&mut self.upstream, ticker)
    }

    pub fn variation(&mut self, ticker: &str, days: u32) -> (Option<f64>, Option<f64>) {
        self.variations
            .percent_change(&mut self.upstream, ticker, days)
    }

    pub fn variation_detailed(
        &mut self,
        ticker: &str,
        days: u32,
    ) -> std::result::Result<Variation, VariationError> {
        self.variations
            .percent_change_detailed(&mut self.upstream, ticker, days)
    }

    pub fn comparative_report(&mut self, category: Option<&str>) -> ComparativeReport {
        build_report(
            &mut self.upstream,
            &self.quotes,
            &self.variations,
            &self.watchlist,
            category,
            self.settings.report_pause,
        )
    }

    pub fn cache_status(&self) -> Vec<CacheStatus> {
        self.cache.status(self.upstream.now())
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    pub fn watchlist_mut(&mut self) -> &mut Watchlist {
        &mut self.watchlist
    }

    pub fn save_watchlist(&self) -> Result<()> {
        self.watchlist.save(&self.settings.data_file)
    }
}
