use std::collections::HashMap;
use std::fs;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Certificate;

use crate::config::ProviderSettings;
use crate::error::{AppError, Context, Result};

/// Build the blocking HTTP client shared by every provider call.
pub fn build_client(settings: &ProviderSettings) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(settings.timeout)
        .user_agent(settings.user_agent.as_str())
        .default_headers(build_headers(&settings.headers)?);

    if let Some(path) = &settings.ca_certificate {
        let pem = fs::read(path)
            .with_context(|| format!("Failed to read CA certificate {}", path.display()))?;
        let certificate = Certificate::from_pem(&pem)
            .with_context(|| format!("Invalid PEM certificate in {}", path.display()))?;
        log::info!("Trusting extra CA certificate from {}", path.display());
        builder = builder.add_root_certificate(certificate);
    }

    if settings.accept_invalid_certs {
        log::warn!("TLS certificate verification is DISABLED for market-data requests");
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder
        .build()
        .context("Failed to construct market-data HTTP client")?)
}

/// Substitute `{name}` placeholders in an endpoint template.
pub fn render_template(template: &str, replacements: &[(&str, &str)]) -> Result<String> {
    let lookup: HashMap<&str, &str> = replacements.iter().copied().collect();
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '{' {
            let mut key = String::new();
            let mut closed = false;
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == '}' {
                    closed = true;
                    break;
                }
                key.push(next);
            }

            if !closed {
                return Err(AppError::message(format!(
                    "Unterminated placeholder in template: {{{key}"
                )));
            }

            let value = lookup.get(key.as_str()).ok_or_else(|| {
                AppError::message(format!(
                    "No replacement provided for placeholder `{}` in template",
                    key
                ))
            })?;
            result.push_str(value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn build_headers(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    headers
        .iter()
        .map(|(key, value)| {
            let name = HeaderName::from_bytes(key.as_bytes())
                .with_context(|| format!("Invalid header name: {}", key))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid header value for {}", key))?;
            Ok::<_, AppError>((name, value))
        })
        .collect()
}
