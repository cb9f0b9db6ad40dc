use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::{RetryPolicy, SeriesFetcher};

pub mod loader;
pub mod validator;

pub use loader::load_settings;
pub use validator::validate_settings;

pub const DEFAULT_CONFIG_FILE: &str = "stock_watch.json";

/// Endpoints and transport options for the upstream market-data provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// Series endpoint; `{symbol}` is replaced with the ticker.
    pub chart_url: String,
    /// Quote (fast info) endpoint.
    pub quote_url: String,
    /// Company profile endpoint.
    pub profile_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Extra headers. `${ENV_VAR}` references are expanded when the file is loaded.
    pub headers: HashMap<String, String>,
    /// PEM bundle trusted in addition to the system roots (corporate proxies).
    pub ca_certificate: Option<PathBuf>,
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub request_delay: Duration,
    pub max_retries: u32,
    pub info_max_retries: u32,
    /// Pause between tickers while building the comparative report.
    pub report_pause: Duration,
    pub data_file: PathBuf,
    pub cache_file: PathBuf,
    pub provider: ProviderSettings,
}

impl Settings {
    pub fn builtin() -> Self {
        let headers = HashMap::from([
            (
                "Accept".to_string(),
                "application/json,text/plain,*/*".to_string(),
            ),
            (
                "Accept-Language".to_string(),
                "en-US,en;q=0.9".to_string(),
            ),
        ]);

        Settings {
            request_delay: Duration::from_secs(2),
            max_retries: 3,
            info_max_retries: 2,
            report_pause: Duration::from_millis(500),
            data_file: PathBuf::from("stocks_data.json"),
            cache_file: PathBuf::from("stocks_cache.json"),
            provider: ProviderSettings {
                chart_url: "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}".to_string(),
                quote_url: "https://query1.finance.yahoo.com/v7/finance/quote?symbols={symbol}"
                    .to_string(),
                profile_url:
                    "https://query2.finance.yahoo.com/v10/finance/quoteSummary/{symbol}?modules=assetProfile,price,summaryDetail"
                        .to_string(),
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
                timeout: Duration::from_secs(15),
                headers,
                ca_certificate: None,
                accept_invalid_certs: false,
            },
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.request_delay)
    }

    pub fn series_fetcher(&self) -> SeriesFetcher {
        SeriesFetcher::new(self.retry_policy()).with_info_retries(self.info_max_retries)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::builtin()
    }
}
