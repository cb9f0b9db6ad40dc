use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;

use crate::error::{Context, Result};
use crate::fetch::{QuoteFetcher, Upstream, VariationCalculator};
use crate::records::Watchlist;
use crate::utils::Currency;

/// Look-back windows, in days, reported for every ticker.
pub const REPORT_WINDOWS: [u32; 6] = [1, 7, 30, 90, 180, 365];

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub ticker: String,
    pub category: String,
    pub currency: Currency,
    pub price: Option<f64>,
    /// One entry per [`REPORT_WINDOWS`] element, in the same order.
    pub variations: Vec<Option<f64>>,
}

impl ReportRow {
    pub fn variation(&self, days: u32) -> Option<f64> {
        REPORT_WINDOWS
            .iter()
            .position(|window| *window == days)
            .and_then(|index| self.variations.get(index).copied().flatten())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparativeReport {
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<ReportRow>,
}

/// Build the report serially, pausing between tickers.
pub fn build_report(
    upstream: &mut Upstream,
    quotes: &QuoteFetcher,
    variations: &VariationCalculator,
    watchlist: &Watchlist,
    category: Option<&str>,
    pause: Duration,
) -> ComparativeReport {
    let tickers = watchlist.tickers_in(category);
    let total = tickers.len();
    let mut rows = Vec::with_capacity(total);

    for (index, ticker) in tickers.into_iter().enumerate() {
        info!("Processing {} ({}/{})", ticker, index + 1, total);

        let price = quotes
            .get_current_quote(upstream, &ticker)
            .map(|quote| quote.price);
        let windows: Vec<Option<f64>> = REPORT_WINDOWS
            .iter()
            .map(|days| variations.percent_change(upstream, &ticker, *days).0)
            .collect();

        rows.push(ReportRow {
            category: watchlist.category_of(&ticker).to_string(),
            currency: Currency::for_ticker(&ticker),
            price,
            variations: windows,
            ticker,
        });

        if index + 1 < total && !pause.is_zero() {
            upstream.sleep(pause);
        }
    }

    ComparativeReport {
        generated_at: upstream.now(),
        rows,
    }
}

pub fn write_report_csv<W: io::Write>(writer: W, report: &ComparativeReport) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header = vec![
        "Ticker".to_string(),
        "Category".to_string(),
        "Currency".to_string(),
        "Price".to_string(),
    ];
    header.extend(REPORT_WINDOWS.iter().map(|days| format!("Var {}d (%)", days)));
    writer.write_record(&header)?;

    let cell = |value: Option<f64>| value.map(|v| format!("{:.2}", v)).unwrap_or_default();
    for row in &report.rows {
        let mut record = vec![
            row.ticker.clone(),
            row.category.clone(),
            row.currency.code().to_string(),
            cell(row.price),
        ];
        record.extend(row.variations.iter().map(|value| cell(*value)));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn export_report(path: &Path, report: &ComparativeReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    write_report_csv(file, report)
}
