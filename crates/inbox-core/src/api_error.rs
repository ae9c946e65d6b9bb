//! Remote API failure taxonomy.
//!
//! HTTP failures are decoded into [`ApiError`] once, at the adapter boundary.
//! Call sites only ever match on the variant; nobody re-inspects raw bodies.

use std::{fmt, time::Duration};

use serde_json::Value;

const BASE_DELAY_MS: u64 = 1000;
const MAX_DELAY_MS: u64 = 8000;

/// Body fields checked, in order, for a human-readable message.
const MESSAGE_FIELDS: [&str; 4] = ["detail", "message", "error", "non_field_errors"];

pub const MSG_UNREACHABLE: &str =
    "Unable to connect to the server. Please check your internet connection.";
pub const MSG_NETWORK: &str = "A network error occurred. Please try again.";
pub const MSG_SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";
pub const MSG_FORBIDDEN: &str = "You do not have permission to perform this action.";
pub const MSG_NOT_FOUND: &str = "The requested resource was not found.";
pub const MSG_RATE_LIMITED: &str = "Too many requests. Please wait a moment and try again.";
pub const MSG_SERVER_ERROR: &str = "Something went wrong on our end. Please try again later.";
pub const MSG_UNAVAILABLE: &str =
    "The service is temporarily unavailable. Please try again shortly.";
pub const MSG_FALLBACK: &str = "An unexpected error occurred. Please try again.";

/// Failure with no HTTP response at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkFailure {
    /// Connection could not be established (the classic "Network Error").
    Unreachable,
    Timeout,
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network failure: {failure}")]
    Network { failure: NetworkFailure },

    /// Any non-5xx status other than 429. `message` is already extracted from the body.
    #[error("request rejected ({status}): {message}")]
    Client { status: u16, message: String },

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// 5xx. `message` is the body message, shown for codes without a fixed wording.
    #[error("server error ({status})")]
    Server {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },
}

impl fmt::Display for NetworkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFailure::Unreachable => f.write_str("Network Error"),
            NetworkFailure::Timeout => f.write_str("request timed out"),
            NetworkFailure::Other(s) => f.write_str(s),
        }
    }
}

impl ApiError {
    pub fn network(failure: NetworkFailure) -> Self {
        ApiError::Network { failure }
    }

    /// Decode a non-success HTTP response.
    ///
    /// `retry_after` is the raw `Retry-After` header (seconds); unparseable values are ignored.
    pub fn from_response(status: u16, retry_after: Option<&str>, body: &Value) -> Self {
        let retry_after = retry_after.and_then(parse_retry_after);
        match status {
            429 => ApiError::RateLimited { retry_after },
            s if s >= 500 => ApiError::Server {
                status: s,
                message: extract_body_message(body),
                retry_after,
            },
            s => ApiError::Client {
                status: s,
                message: extract_body_message(body),
            },
        }
    }

    /// HTTP status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Network { .. } => None,
            ApiError::Client { status, .. } | ApiError::Server { status, .. } => Some(*status),
            ApiError::RateLimited { .. } => Some(429),
        }
    }

    /// Single user-facing message for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network {
                failure: NetworkFailure::Unreachable,
            } => MSG_UNREACHABLE.to_string(),
            ApiError::Network { .. } => MSG_NETWORK.to_string(),
            ApiError::RateLimited { .. } => MSG_RATE_LIMITED.to_string(),
            ApiError::Server { status, message, .. } => match status {
                500 => MSG_SERVER_ERROR.to_string(),
                502..=504 => MSG_UNAVAILABLE.to_string(),
                _ => message.clone(),
            },
            ApiError::Client { status, message } => match status {
                401 => MSG_SESSION_EXPIRED.to_string(),
                403 => MSG_FORBIDDEN.to_string(),
                404 => MSG_NOT_FOUND.to_string(),
                _ => message.clone(),
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network { .. } | ApiError::RateLimited { .. } | ApiError::Server { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after } | ApiError::Server { retry_after, .. } => {
                *retry_after
            }
            _ => None,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// Server hint wins; otherwise `min(1000 * 2^attempt, 8000)` ms.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        if let Some(d) = self.retry_after() {
            return d;
        }
        backoff_delay(attempt)
    }
}

pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(BASE_DELAY_MS.saturating_mul(factor).min(MAX_DELAY_MS))
}

fn parse_retry_after(raw: &str) -> Option<Duration> {
    let secs = raw.trim().parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_millis((secs * 1000.0) as u64))
}

/// Pull the most useful human-readable message out of an error body.
pub fn extract_body_message(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            for field in MESSAGE_FIELDS {
                if let Some(text) = map.get(field).and_then(first_text) {
                    return text;
                }
            }
            map.iter()
                .find_map(|(key, value)| {
                    first_text(value).map(|text| format!("{}: {text}", title_case(key)))
                })
                .unwrap_or_else(|| MSG_FALLBACK.to_string())
        }
        _ => MSG_FALLBACK.to_string(),
    }
}

/// First scalar of a value that may be a single item or a sequence.
fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.first().and_then(first_text),
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Object(_) => None,
    }
}

/// `phone_number` -> `Phone Number`.
fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
