use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;
use crate::fetch::{Bar, BarField, PriceSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Equal,
}

impl Comparison {
    pub const ALL: [Comparison; 5] = [
        Comparison::Greater,
        Comparison::Less,
        Comparison::GreaterOrEqual,
        Comparison::LessOrEqual,
        Comparison::Equal,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::Less => "<",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "==",
        }
    }

    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Greater => lhs > rhs,
            Comparison::Less => lhs < rhs,
            Comparison::GreaterOrEqual => lhs >= rhs,
            Comparison::LessOrEqual => lhs <= rhs,
            Comparison::Equal => lhs == rhs,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Comparison {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Comparison::ALL
            .into_iter()
            .find(|op| op.symbol() == trimmed)
            .ok_or_else(|| {
                AppError::message(format!(
                    "Unknown operator `{}` (expected one of >, <, >=, <=, ==)",
                    s
                ))
            })
    }
}

impl Serialize for Comparison {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Comparison {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Named row filter over one bar column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: BarField,
    pub operator: Comparison,
    pub value: f64,
}

impl Filter {
    pub fn new(field: BarField, operator: Comparison, value: f64) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    pub fn matches(&self, bar: &Bar) -> bool {
        match bar.value(self.field) {
            Some(lhs) => self.operator.holds(lhs, self.value),
            None => false,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

/// Keep bars satisfying every filter. Filters on a column the series does
/// not carry are skipped.
pub fn apply_filters<'a, I>(series: &PriceSeries, filters: I) -> PriceSeries
where
    I: IntoIterator<Item = &'a Filter>,
{
    let active: Vec<&Filter> = filters
        .into_iter()
        .filter(|filter| series.has_field(filter.field))
        .collect();

    if active.is_empty() {
        return series.clone();
    }

    let bars = series
        .bars()
        .iter()
        .filter(|bar| active.iter().all(|filter| filter.matches(bar)))
        .cloned()
        .collect();
    PriceSeries::new(bars)
}
