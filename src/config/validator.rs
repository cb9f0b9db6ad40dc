use std::time::Duration;

use crate::error::{AppError, Result};

use super::{ProviderSettings, Settings};

const SYMBOL_PLACEHOLDER: &str = "{symbol}";

/// Validate loaded settings and surface every problem at once.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    let mut issues = Vec::new();

    validate_pacing(settings, &mut issues);
    validate_provider(&settings.provider, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "configuration invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

/// Reject raw second counts that cannot become a `Duration`, before they are
/// converted and the original value is lost.
pub fn validate_durations(fields: &[(&str, Option<f64>)]) -> Result<()> {
    let issues: Vec<String> = fields
        .iter()
        .filter_map(|(name, value)| Some((name, (*value)?)))
        .filter(|(_, value)| Duration::try_from_secs_f64(*value).is_err())
        .map(|(name, value)| format!("{name} must be a non-negative number of seconds, got {value}"))
        .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "configuration invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_pacing(settings: &Settings, issues: &mut Vec<String>) {
    if settings.request_delay.is_zero() {
        issues.push("request_delay_secs must be greater than zero".to_string());
    }
    if settings.max_retries == 0 {
        issues.push("max_retries must be at least 1".to_string());
    }
    if settings.info_max_retries == 0 {
        issues.push("info_max_retries must be at least 1".to_string());
    }
}

fn validate_provider(provider: &ProviderSettings, issues: &mut Vec<String>) {
    for (name, template) in [
        ("provider.chart_url", &provider.chart_url),
        ("provider.quote_url", &provider.quote_url),
        ("provider.profile_url", &provider.profile_url),
    ] {
        if template.trim().is_empty() {
            issues.push(format!("{name} must not be empty"));
        } else if !template.contains(SYMBOL_PLACEHOLDER) {
            issues.push(format!("{name} must contain the {SYMBOL_PLACEHOLDER} placeholder"));
        }
    }

    if provider.timeout.is_zero() {
        issues.push("provider.timeout_secs must be greater than zero".to_string());
    }

    if let Some(path) = &provider.ca_certificate {
        if !path.exists() {
            issues.push(format!(
                "provider.ca_certificate not found: {}",
                path.display()
            ));
        }
    }
}
