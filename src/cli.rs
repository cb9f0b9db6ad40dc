use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::fetch::{BarField, Period};
use crate::records::Comparison;

#[derive(Debug, Parser)]
#[command(name = "stock-watch")]
#[command(about = "Rate-limited, cached stock price lookups with a local watchlist")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file; built-in defaults apply when it does not exist
    #[arg(short, long, default_value = crate::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Override the watchlist document location
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Override the response cache location
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch a price series and print its summary
    Series {
        ticker: String,
        /// 1d, 7d, 1mo, ytd, 1y, 3y or 5y
        #[arg(short, long, default_value = "1mo")]
        period: Period,
        /// Saved filter to apply (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
        /// Directory to write a CSV export into
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Show the current (delayed) quote
    Quote { ticker: String },

    /// Percent change over the last N days
    Variation {
        ticker: String,
        #[arg(short, long)]
        days: u32,
    },

    /// Comparative report over the watchlist
    Report {
        #[arg(long)]
        category: Option<String>,
        /// CSV file to write the report to
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Manage tracked tickers
    Tickers {
        #[command(subcommand)]
        action: TickerAction,
    },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Manage saved series filters
    Filters {
        #[command(subcommand)]
        action: FilterAction,
    },

    /// Show or set the columns used for series export
    Columns { fields: Vec<BarField> },

    /// Inspect the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum TickerAction {
    List,
    Add {
        #[arg(required = true)]
        tickers: Vec<String>,
        #[arg(long)]
        category: Option<String>,
    },
    Remove { ticker: String },
    Rename { from: String, to: String },
}

#[derive(Debug, Subcommand)]
pub enum CategoryAction {
    List,
    Add { name: String },
    Remove { name: String },
    Rename { from: String, to: String },
    /// Assign a ticker; omit the category to clear it
    Assign {
        ticker: String,
        category: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum FilterAction {
    List,
    Add {
        name: String,
        field: BarField,
        /// One of >, <, >=, <=, ==
        operator: Comparison,
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    Remove { name: String },
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_series_arguments() {
        let cli = Cli::parse_from([
            "stock-watch",
            "-vv",
            "series",
            "PETR4.SA",
            "--period",
            "1y",
            "--filter",
            "alta",
        ]);

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Series {
                ticker,
                period,
                filters,
                export,
            } => {
                assert_eq!(ticker, "PETR4.SA");
                assert_eq!(period, Period::OneYear);
                assert_eq!(filters, vec!["alta".to_string()]);
                assert!(export.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_period() {
        assert!(Cli::try_parse_from(["stock-watch", "series", "AAPL", "-p", "2w"]).is_err());
    }

    #[test]
    fn parses_filter_definition() {
        let cli = Cli::parse_from([
            "stock-watch", "filters", "add", "queda", "Close", "<", "-1.5",
        ]);
        match cli.command {
            Commands::Filters {
                action:
                    FilterAction::Add {
                        field,
                        operator,
                        value,
                        ..
                    },
            } => {
                assert_eq!(field, BarField::Close);
                assert_eq!(operator, Comparison::Less);
                assert_eq!(value, -1.5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
