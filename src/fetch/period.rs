use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::error::AppError;

/// Closed set of lookback windows a series can be requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    OneDay,
    OneWeek,
    OneMonth,
    YearToDate,
    OneYear,
    ThreeYears,
    FiveYears,
}

/// Window length used by the fallback download when a period code is not recognised.
pub const DEFAULT_FALLBACK_DAYS: i64 = 30;

impl Period {
    pub const ALL: [Period; 7] = [
        Period::OneDay,
        Period::OneWeek,
        Period::OneMonth,
        Period::YearToDate,
        Period::OneYear,
        Period::ThreeYears,
        Period::FiveYears,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Period::OneDay => "1 Day",
            Period::OneWeek => "1 Week",
            Period::OneMonth => "1 Month",
            Period::YearToDate => "Year-to-date",
            Period::OneYear => "1 Year",
            Period::ThreeYears => "3 Years",
            Period::FiveYears => "5 Years",
        }
    }

    /// Provider-native period shorthand.
    pub fn code(self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::OneWeek => "7d",
            Period::OneMonth => "1mo",
            Period::YearToDate => "ytd",
            Period::OneYear => "1y",
            Period::ThreeYears => "3y",
            Period::FiveYears => "5y",
        }
    }

    pub fn from_code(code: &str) -> Option<Period> {
        let code = code.trim().to_ascii_lowercase();
        Period::ALL.into_iter().find(|period| period.code() == code)
    }

    /// Explicit `(start, end)` window for the date-bounded fallback strategy.
    pub fn fallback_window(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        fallback_window_for_code(self.code(), now)
    }
}

/// Derive a date window from a raw period code; unknown codes map to the last 30 days.
pub fn fallback_window_for_code(code: &str, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = match code {
        "1d" => start_of_day(now),
        "7d" => now - Duration::days(7),
        "1mo" => now - Duration::days(30),
        "ytd" => Utc
            .with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(|| now - Duration::days(DEFAULT_FALLBACK_DAYS)),
        "1y" => now - Duration::days(365),
        "3y" => now - Duration::days(365 * 3),
        "5y" => now - Duration::days(365 * 5),
        _ => now - Duration::days(DEFAULT_FALLBACK_DAYS),
    };
    (start, now)
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(now)
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::from_code(s).ok_or_else(|| {
            let known: Vec<&str> = Period::ALL.iter().map(|p| p.code()).collect();
            AppError::message(format!(
                "Unknown period `{}` (expected one of {})",
                s,
                known.join(", ")
            ))
        })
    }
}
