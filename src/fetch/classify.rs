use std::fmt;

/// How the fetch layer reacts to an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Session/crumb invalidation: switch to the secondary strategy right away.
    AuthExpiry,
    /// Provider throttling: steeper backoff, retry on the primary strategy only.
    RateLimited,
    /// Network, timeout or anything unrecognised: normal backoff.
    Transient,
}

/// Marker substrings searched in upstream error text, first match wins.
pub const ERROR_MARKERS: &[(&str, ErrorClass)] = &[
    ("Crumb", ErrorClass::AuthExpiry),
    ("Unauthorized", ErrorClass::AuthExpiry),
    ("429", ErrorClass::RateLimited),
    ("Too Many Requests", ErrorClass::RateLimited),
];

pub fn classify(message: &str) -> ErrorClass {
    ERROR_MARKERS
        .iter()
        .find(|(marker, _)| message.contains(marker))
        .map(|(_, class)| *class)
        .unwrap_or(ErrorClass::Transient)
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::AuthExpiry => "auth-expiry",
            ErrorClass::RateLimited => "rate-limited",
            ErrorClass::Transient => "transient",
        };
        f.write_str(name)
    }
}
