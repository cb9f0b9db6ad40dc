use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::AppError;

/// Company/exchange attributes attached to a series. May be empty.
pub type InfoMap = BTreeMap<String, Value>;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// One time-indexed OHLCV row, plus corporate actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(rename = "Date", with = "bar_date")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: f64,
    #[serde(rename = "Dividends", default)]
    pub dividends: f64,
    #[serde(rename = "Stock Splits", default)]
    pub stock_splits: f64,
    #[serde(
        rename = "Adj Close",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub adj_close: Option<f64>,
}

impl Bar {
    pub fn value(&self, field: BarField) -> Option<f64> {
        match field {
            BarField::Open => Some(self.open),
            BarField::High => Some(self.high),
            BarField::Low => Some(self.low),
            BarField::Close => Some(self.close),
            BarField::Volume => Some(self.volume),
            BarField::Dividends => Some(self.dividends),
            BarField::StockSplits => Some(self.stock_splits),
            BarField::AdjClose => self.adj_close,
        }
    }
}

/// Ordered bar series. Construction always sorts by ascending timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(mut bars: Vec<Bar>) -> Self {
        bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Self { bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// True when at least one bar carries an adjusted close.
    pub fn has_field(&self, field: BarField) -> bool {
        match field {
            BarField::AdjClose => self.bars.iter().any(|bar| bar.adj_close.is_some()),
            _ => true,
        }
    }
}

/// Numeric columns a bar can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    Volume,
    Dividends,
    StockSplits,
    AdjClose,
}

impl BarField {
    pub const ALL: [BarField; 8] = [
        BarField::Open,
        BarField::High,
        BarField::Low,
        BarField::Close,
        BarField::Volume,
        BarField::Dividends,
        BarField::StockSplits,
        BarField::AdjClose,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BarField::Open => "Open",
            BarField::High => "High",
            BarField::Low => "Low",
            BarField::Close => "Close",
            BarField::Volume => "Volume",
            BarField::Dividends => "Dividends",
            BarField::StockSplits => "Stock Splits",
            BarField::AdjClose => "Adj Close",
        }
    }

    /// Columns shown by default: everything except the adjusted close.
    pub fn default_columns() -> Vec<BarField> {
        BarField::ALL
            .into_iter()
            .filter(|field| *field != BarField::AdjClose)
            .collect()
    }
}

impl fmt::Display for BarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BarField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        BarField::ALL
            .into_iter()
            .find(|field| normalize_label(field.label()) == wanted)
            .ok_or_else(|| AppError::message(format!("Unknown bar field `{}`", s)))
    }
}

impl Serialize for BarField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for BarField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Quote-level attributes from the metadata-only path; every field is optional upstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FastInfo {
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub quote_type: Option<String>,
    pub timezone: Option<String>,
    pub last_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub open: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub last_volume: Option<f64>,
}

impl FastInfo {
    /// Reduced company metadata; each attribute falls back to its own default.
    pub fn to_info(&self) -> InfoMap {
        let mut info = InfoMap::new();
        let text = |value: &Option<String>, default: &str| {
            Value::String(value.clone().unwrap_or_else(|| default.to_string()))
        };
        info.insert("currency".to_string(), text(&self.currency, "USD"));
        info.insert("exchange".to_string(), text(&self.exchange, "N/A"));
        info.insert("quoteType".to_string(), text(&self.quote_type, "N/A"));
        info.insert("timezone".to_string(), text(&self.timezone, "N/A"));
        info
    }
}

pub fn format_bar_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(DATE_FORMAT).to_string()
}

/// Accepts the durable `YYYY-MM-DD HH:MM:SS+hh:mm` form, RFC 3339 and bare dates.
pub fn parse_bar_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| AppError::message(format!("Unable to build timestamp from `{}`", raw)))
}

mod bar_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_bar_date(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_bar_date(&raw).map_err(serde::de::Error::custom)
    }
}
