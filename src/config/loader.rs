use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, Context, Result};

use super::{validator, ProviderSettings, Settings};

/// Load settings from a JSON file layered over the builtin defaults.
/// A missing file yields the defaults unchanged.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log::debug!(
                "No config file at {}, using builtin settings",
                path.display()
            );
            return Ok(Settings::builtin());
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to read config file {}", path.display()))?
        }
    };

    let raw: RawSettings = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;

    validator::validate_durations(&raw.durations())?;
    let settings = raw.apply(Settings::builtin())?;
    validator::validate_settings(&settings)?;
    Ok(settings)
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    request_delay_secs: Option<f64>,
    max_retries: Option<u32>,
    info_max_retries: Option<u32>,
    report_pause_secs: Option<f64>,
    data_file: Option<PathBuf>,
    cache_file: Option<PathBuf>,
    #[serde(default)]
    provider: RawProviderSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProviderSettings {
    chart_url: Option<String>,
    quote_url: Option<String>,
    profile_url: Option<String>,
    user_agent: Option<String>,
    timeout_secs: Option<f64>,
    #[serde(default)]
    headers: HashMap<String, String>,
    ca_certificate: Option<PathBuf>,
    accept_invalid_certs: Option<bool>,
}

impl RawSettings {
    fn durations(&self) -> [(&'static str, Option<f64>); 3] {
        [
            ("request_delay_secs", self.request_delay_secs),
            ("report_pause_secs", self.report_pause_secs),
            ("provider.timeout_secs", self.provider.timeout_secs),
        ]
    }

    fn apply(self, defaults: Settings) -> Result<Settings> {
        Ok(Settings {
            request_delay: self
                .request_delay_secs
                .map(seconds)
                .unwrap_or(defaults.request_delay),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            info_max_retries: self.info_max_retries.unwrap_or(defaults.info_max_retries),
            report_pause: self
                .report_pause_secs
                .map(seconds)
                .unwrap_or(defaults.report_pause),
            data_file: self.data_file.unwrap_or(defaults.data_file),
            cache_file: self.cache_file.unwrap_or(defaults.cache_file),
            provider: self.provider.apply(defaults.provider)?,
        })
    }
}

impl RawProviderSettings {
    fn apply(self, defaults: ProviderSettings) -> Result<ProviderSettings> {
        let mut headers = defaults.headers;
        for (name, value) in self.headers {
            let value = expand_env(&value)
                .with_context(|| format!("failed to expand provider header {name}"))?;
            headers.insert(name, value);
        }

        Ok(ProviderSettings {
            chart_url: self.chart_url.unwrap_or(defaults.chart_url),
            quote_url: self.quote_url.unwrap_or(defaults.quote_url),
            profile_url: self.profile_url.unwrap_or(defaults.profile_url),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            timeout: self.timeout_secs.map(seconds).unwrap_or(defaults.timeout),
            headers,
            ca_certificate: self.ca_certificate.or(defaults.ca_certificate),
            accept_invalid_certs: self
                .accept_invalid_certs
                .unwrap_or(defaults.accept_invalid_certs),
        })
    }
}

/// Replace `${NAME}` references with the named environment variable.
fn expand_env(value: &str) -> Result<String> {
    let mut expanded = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let end = tail
            .find('}')
            .ok_or_else(|| AppError::message(format!("unterminated `${{` in `{value}`")))?;
        let name = &tail[..end];
        if name.is_empty() {
            return Err(AppError::message(format!("empty `${{}}` in `{value}`")));
        }
        let resolved = std::env::var(name)
            .with_context(|| format!("environment variable {name} is not set"))?;
        expanded.push_str(&resolved);
        rest = &tail[end + 1..];
    }
    expanded.push_str(rest);
    Ok(expanded)
}

/// Only called on values `validate_durations` accepted.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
