use chrono::{DateTime, Utc};
use thiserror::Error;

use super::bars::{FastInfo, InfoMap, PriceSeries};

/// Opaque upstream failure. Only its text is available for classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::new(err.to_string())
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Upstream market-data calls. Every call is issued exactly once; pacing and
/// retries belong to the caller.
pub trait MarketDataProvider {
    /// Primary strategy: series for a provider-native period code.
    fn history(&self, ticker: &str, period_code: &str) -> ProviderResult<PriceSeries>;

    /// Secondary strategy: date-bounded download shaped for a single ticker.
    fn download(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<PriceSeries>;

    /// Daily bars between two instants, used by the variation calculator.
    fn history_range(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<PriceSeries>;

    /// Most granular bars available for the current session.
    fn intraday(&self, ticker: &str) -> ProviderResult<PriceSeries>;

    /// Metadata-only quote path.
    fn fast_info(&self, ticker: &str) -> ProviderResult<FastInfo>;

    /// Company profile attributes.
    fn info(&self, ticker: &str) -> ProviderResult<InfoMap>;
}
