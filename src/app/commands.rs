use std::path::Path;

use serde_json::Value;

use crate::cli::{CacheAction, CategoryAction, Commands, FilterAction, TickerAction};
use crate::error::{AppError, Result};
use crate::fetch::{BarField, FetchedSeries, InfoMap, Period};
use crate::records::{apply_filters, export_series, Filter, UNCATEGORISED};
use crate::utils::{format_local, format_percent, Currency};

use super::report::{export_report, ComparativeReport, REPORT_WINDOWS};
use super::state::AppState;
use super::summary::summarize;

/// Profile attributes echoed after a series summary, when present.
const PROFILE_FIELDS: [(&str, &str); 5] = [
    ("longName", "Name"),
    ("sector", "Sector"),
    ("industry", "Industry"),
    ("exchange", "Exchange"),
    ("marketCap", "Market cap"),
];

pub fn run(state: &mut AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Series {
            ticker,
            period,
            filters,
            export,
        } => show_series(state, &ticker, period, &filters, export.as_deref()),
        Commands::Quote { ticker } => show_quote(state, &ticker),
        Commands::Variation { ticker, days } => show_variation(state, &ticker, days),
        Commands::Report { category, export } => {
            show_report(state, category.as_deref(), export.as_deref())
        }
        Commands::Tickers { action } => manage_tickers(state, action),
        Commands::Categories { action } => manage_categories(state, action),
        Commands::Filters { action } => manage_filters(state, action),
        Commands::Columns { fields } => manage_columns(state, fields),
        Commands::Cache {
            action: CacheAction::Status,
        } => show_cache_status(state),
    }
}

fn show_series(
    state: &mut AppState,
    ticker: &str,
    period: Period,
    filter_names: &[String],
    export_dir: Option<&Path>,
) -> Result<()> {
    let filters = filter_names
        .iter()
        .map(|name| {
            state
                .watchlist()
                .filters()
                .get(name)
                .cloned()
                .ok_or_else(|| AppError::message(format!("No filter named `{}`", name)))
        })
        .collect::<Result<Vec<Filter>>>()?;

    let fetched = state
        .fetch_series(ticker, period)
        .map_err(|failure| AppError::message(failure.message))?;
    let FetchedSeries {
        ticker,
        series,
        info,
        from_cache,
        attempts,
        ..
    } = fetched;

    let series = apply_filters(&series, &filters);
    let currency = Currency::for_ticker(&ticker);

    println!(
        "{} ({}) - {} bars{}",
        ticker,
        period.label(),
        series.len(),
        if from_cache {
            " [cache]".to_string()
        } else {
            format!(" [{} upstream calls]", attempts.len())
        }
    );

    match summarize(&series, currency) {
        Some(summary) => {
            println!("  Last close:   {}", currency.format(summary.last_close));
            println!("  Change:       {}", format_percent(Some(summary.change_percent)));
            println!("  Period high:  {}", currency.format(summary.high));
            println!("  Period low:   {}", currency.format(summary.low));
            println!("  Mean volume:  {:.0}", summary.mean_volume);
        }
        None => println!("  No bars left after filtering"),
    }
    print_profile(&info);

    if let Some(dir) = export_dir {
        let columns = state.watchlist().selected_columns().to_vec();
        let path = export_series(dir, &ticker, period, &series, &columns, state.upstream().now())?;
        println!("Exported to {}", path.display());
    }
    Ok(())
}

fn print_profile(info: &InfoMap) {
    for (key, label) in PROFILE_FIELDS {
        let Some(value) = info.get(key) else {
            continue;
        };
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        println!("  {:<13} {}", format!("{}:", label), text);
    }
}

fn show_quote(state: &mut AppState, ticker: &str) -> Result<()> {
    let quote = state
        .quote(ticker)
        .ok_or_else(|| AppError::message(format!("No quote available for {}", ticker.trim())))?;

    println!(
        "{}  {}  ({:+.2}, {})",
        quote.ticker,
        quote.currency.format(quote.price),
        quote.change(),
        format_percent(Some(quote.change_percent()))
    );
    println!(
        "  Open {}  High {}  Low {}  Volume {:.0}",
        quote.currency.format(quote.open),
        quote.currency.format(quote.day_high),
        quote.currency.format(quote.day_low),
        quote.volume
    );
    println!("  As of {} ({})", format_local(quote.as_of), quote.delay_label);
    Ok(())
}

fn show_variation(state: &mut AppState, ticker: &str, days: u32) -> Result<()> {
    let variation = state
        .variation_detailed(ticker, days)
        .map_err(|err| AppError::message(format!("{}: {}", ticker.trim(), err)))?;
    let currency = Currency::for_ticker(ticker);
    println!(
        "{} over {} days: {} (latest {})",
        ticker.trim().to_ascii_uppercase(),
        days,
        format_percent(Some(variation.percent)),
        currency.format(variation.latest_price)
    );
    Ok(())
}

fn show_report(state: &mut AppState, category: Option<&str>, export: Option<&Path>) -> Result<()> {
    if state.watchlist().stocks().is_empty() {
        return Err(AppError::message("The watchlist is empty; add tickers first"));
    }
    let report = state.comparative_report(category);
    print_report(&report);

    if let Some(path) = export {
        export_report(path, &report)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn print_report(report: &ComparativeReport) {
    let mut header = format!("{:<12} {:<16} {:>12}", "Ticker", "Category", "Price");
    for days in REPORT_WINDOWS {
        header.push_str(&format!(" {:>9}", format!("{}d", days)));
    }
    println!("{}", header);

    for row in &report.rows {
        let price = row
            .price
            .map(|price| row.currency.format(price))
            .unwrap_or_else(|| "N/A".to_string());
        let mut line = format!("{:<12} {:<16} {:>12}", row.ticker, row.category, price);
        for value in &row.variations {
            line.push_str(&format!(" {:>9}", format_percent(*value)));
        }
        println!("{}", line);
    }
    println!("Generated {}", format_local(report.generated_at));
}

fn manage_tickers(state: &mut AppState, action: TickerAction) -> Result<()> {
    match action {
        TickerAction::List => {
            let watchlist = state.watchlist();
            if watchlist.stocks().is_empty() {
                println!("No tickers tracked yet.");
            }
            for ticker in watchlist.stocks() {
                println!("{:<12} {}", ticker, watchlist.category_of(ticker));
            }
            return Ok(());
        }
        TickerAction::Add { tickers, category } => {
            for ticker in tickers {
                let added = state.watchlist_mut().add_ticker(&ticker)?;
                if let Some(category) = category.as_deref() {
                    state.watchlist_mut().assign_category(&added, Some(category))?;
                }
                println!("Added {}", added);
            }
        }
        TickerAction::Remove { ticker } => {
            state.watchlist_mut().remove_ticker(&ticker)?;
            println!("Removed {}", ticker.trim().to_ascii_uppercase());
        }
        TickerAction::Rename { from, to } => {
            let renamed = state.watchlist_mut().rename_ticker(&from, &to)?;
            println!("Renamed {} to {}", from.trim().to_ascii_uppercase(), renamed);
        }
    }
    state.save_watchlist()
}

fn manage_categories(state: &mut AppState, action: CategoryAction) -> Result<()> {
    match action {
        CategoryAction::List => {
            let watchlist = state.watchlist();
            for name in watchlist.category_list() {
                println!("{:<20} {} tickers", name, watchlist.tickers_in(Some(name.as_str())).len());
            }
            println!(
                "{:<20} {} tickers",
                UNCATEGORISED,
                watchlist.tickers_in(Some(UNCATEGORISED)).len()
            );
            return Ok(());
        }
        CategoryAction::Add { name } => {
            state.watchlist_mut().add_category(&name)?;
            println!("Added category {}", name.trim());
        }
        CategoryAction::Remove { name } => {
            state.watchlist_mut().remove_category(&name)?;
            println!("Removed category {}", name);
        }
        CategoryAction::Rename { from, to } => {
            state.watchlist_mut().rename_category(&from, &to)?;
            println!("Renamed category {} to {}", from, to.trim());
        }
        CategoryAction::Assign { ticker, category } => {
            state
                .watchlist_mut()
                .assign_category(&ticker, category.as_deref())?;
            println!(
                "{} -> {}",
                ticker.trim().to_ascii_uppercase(),
                category.as_deref().unwrap_or(UNCATEGORISED)
            );
        }
    }
    state.save_watchlist()
}

fn manage_filters(state: &mut AppState, action: FilterAction) -> Result<()> {
    match action {
        FilterAction::List => {
            let filters = state.watchlist().filters();
            if filters.is_empty() {
                println!("No filters saved.");
            }
            for (name, filter) in filters {
                println!("{:<16} {}", name, filter);
            }
            return Ok(());
        }
        FilterAction::Add {
            name,
            field,
            operator,
            value,
        } => {
            let filter = Filter::new(field, operator, value);
            let description = filter.to_string();
            state.watchlist_mut().add_filter(&name, filter)?;
            println!("Saved filter {}: {}", name.trim(), description);
        }
        FilterAction::Remove { name } => {
            let removed = state.watchlist_mut().remove_filter(&name)?;
            println!("Removed filter {} ({})", name, removed);
        }
    }
    state.save_watchlist()
}

fn manage_columns(state: &mut AppState, fields: Vec<BarField>) -> Result<()> {
    if !fields.is_empty() {
        state.watchlist_mut().set_selected_columns(fields);
        state.save_watchlist()?;
    }
    let labels: Vec<&str> = state
        .watchlist()
        .selected_columns()
        .iter()
        .map(|field| field.label())
        .collect();
    println!("Columns: {}", labels.join(", "));
    Ok(())
}

fn show_cache_status(state: &AppState) -> Result<()> {
    let entries = state.cache_status();
    match state.cache().path() {
        Some(path) => println!("Cache file: {}", path.display()),
        None => println!("Cache is in memory only"),
    }
    if entries.is_empty() {
        println!("No cached series.");
    }
    for entry in entries {
        println!(
            "{:<20} {:>5} bars  {:>7.0}s old  {}",
            entry.key,
            entry.bars,
            entry.age_secs,
            if entry.fresh { "fresh" } else { "stale" }
        );
    }
    Ok(())
}
