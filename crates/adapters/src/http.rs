//! Shared HTTP plumbing for the platform adapters

use crosspost_domain::ports::AdapterError;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub(crate) fn build_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client")
}

/// Map a non-success response status to the adapter error taxonomy
pub(crate) fn error_for_status(status: StatusCode, body: String) -> AdapterError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        AdapterError::Credential(format!("access token rejected ({})", status.as_u16()))
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        AdapterError::RateLimited
    } else if status.is_server_error() {
        AdapterError::Transient(format!("server error {}: {}", status.as_u16(), body))
    } else {
        AdapterError::Api(format!("unexpected status {}: {}", status.as_u16(), body))
    }
}

/// Map a reqwest transport failure; all transport-level failures are
/// transient by definition
pub(crate) fn transport_error(error: reqwest::Error) -> AdapterError {
    if error.is_timeout() {
        AdapterError::Transient(format!("request timeout: {}", error))
    } else if error.is_connect() {
        AdapterError::Transient(format!("connection error: {}", error))
    } else {
        AdapterError::Transient(format!("network error: {}", error))
    }
}

/// Remaining call budget from the Graph `x-app-usage` header, which
/// reports percentages used
pub(crate) fn graph_rate_limit_remaining(headers: &HeaderMap) -> Option<u32> {
    let raw = headers.get("x-app-usage")?.to_str().ok()?;
    let usage: serde_json::Value = serde_json::from_str(raw).ok()?;
    let used = usage.get("call_count")?.as_u64()?;
    Some(100u64.saturating_sub(used) as u32)
}

/// Remaining call budget from a conventional `x-ratelimit-remaining`
/// header
pub(crate) fn header_rate_limit_remaining(headers: &HeaderMap) -> Option<u32> {
    headers
        .get("x-ratelimit-remaining")?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
