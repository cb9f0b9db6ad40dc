use crate::fetch::PriceSeries;
use crate::utils::Currency;

/// Headline figures for a fetched series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub last_close: f64,
    /// First to last close; zero for a single bar.
    pub change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub mean_volume: f64,
    pub bars: usize,
    pub currency: Currency,
}

pub fn summarize(series: &PriceSeries, currency: Currency) -> Option<SeriesSummary> {
    let first = series.first()?;
    let last = series.last()?;
    let bars = series.bars();

    let change_percent = if series.len() > 1 && first.close != 0.0 {
        (last.close - first.close) / first.close * 100.0
    } else {
        0.0
    };

    Some(SeriesSummary {
        last_close: last.close,
        change_percent,
        high: bars.iter().map(|bar| bar.high).fold(f64::MIN, f64::max),
        low: bars.iter().map(|bar| bar.low).fold(f64::MAX, f64::min),
        mean_volume: bars.iter().map(|bar| bar.volume).sum::<f64>() / bars.len() as f64,
        bars: bars.len(),
        currency,
    })
}
