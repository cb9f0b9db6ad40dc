use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{AppError, Context, Result};
use crate::fetch::bars::format_bar_date;
use crate::fetch::{BarField, Period, PriceSeries};
use crate::utils::{export_date_slug, sanitize_file_stem};

/// `{TICKER}_{period}_{YYYYMMDD}.csv`
pub fn export_file_name(ticker: &str, period: Period, now: DateTime<Utc>) -> Result<String> {
    let stem = sanitize_file_stem(&ticker.trim().to_ascii_uppercase())
        .ok_or_else(|| AppError::message(format!("Ticker `{}` is not usable in a file name", ticker)))?;
    Ok(format!("{}_{}_{}.csv", stem, period.code(), export_date_slug(now)))
}

/// Write the series with a leading `Date` column followed by `columns`.
/// Columns the series does not carry are dropped.
pub fn write_series_csv<W: io::Write>(
    writer: W,
    series: &PriceSeries,
    columns: &[BarField],
) -> Result<()> {
    let columns: Vec<BarField> = columns
        .iter()
        .copied()
        .filter(|field| series.has_field(*field))
        .collect();

    let mut writer = csv::Writer::from_writer(writer);
    let mut header = vec!["Date"];
    header.extend(columns.iter().map(|field| field.label()));
    writer.write_record(&header)?;

    for bar in series.bars() {
        let mut record = vec![format_bar_date(&bar.timestamp)];
        record.extend(
            columns
                .iter()
                .map(|field| bar.value(*field).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn export_series(
    dir: &Path,
    ticker: &str,
    period: Period,
    series: &PriceSeries,
    columns: &[BarField],
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let path = dir.join(export_file_name(ticker, period, now)?);
    let file = fs::File::create(&path)
        .with_context(|| format!("Failed to create export file {}", path.display()))?;
    write_series_csv(file, series, columns)?;
    Ok(path)
}
