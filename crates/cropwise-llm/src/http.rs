//! Shared HTTP plumbing for the remote providers

use crate::LlmError;
use cropwise_domain::ErrorKind;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Build a blocking client with a request timeout
///
/// Falls back to a default client if the builder fails (TLS backend init).
pub(crate) fn client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
        Client::new()
    })
}

/// Map a transport-level failure
pub(crate) fn transport_error(provider: &str, error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Communication(format!("{} request timed out: {}", provider, error))
    } else if error.is_connect() {
        LlmError::Communication(format!("{} connection failed: {}", provider, error))
    } else {
        LlmError::Communication(format!("{} request failed: {}", provider, error))
    }
}

/// Pull a human-readable message out of an error body
///
/// Understands `{"error": {"message": ...}}` and `{"error": "..."}`, else
/// returns the trimmed body.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        let error = v.get("error")?;
        error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .map(str::to_string)
    });
    message.unwrap_or_else(|| body.trim().to_string())
}

/// Map a non-success HTTP status and body to an [`LlmError`]
pub(crate) fn status_error(provider: &str, model: &str, status: u16, body: &str) -> LlmError {
    let message = error_message(body);
    let detail = format!("{} HTTP {}: {}", provider, status, message);

    match status {
        401 | 403 => LlmError::Authentication(detail),
        402 => LlmError::QuotaExceeded(detail),
        404 => LlmError::ModelNotAvailable(format!("{} ({})", model, detail)),
        408 | 504 => LlmError::Communication(detail),
        429 | 529 | 503 => {
            if ErrorKind::classify(&message) == ErrorKind::Quota {
                LlmError::QuotaExceeded(detail)
            } else {
                LlmError::RateLimitExceeded(detail)
            }
        }
        _ => match ErrorKind::classify(&message) {
            ErrorKind::Quota => LlmError::QuotaExceeded(detail),
            ErrorKind::RateLimited => LlmError::RateLimitExceeded(detail),
            ErrorKind::Authentication => LlmError::Authentication(detail),
            _ => LlmError::Other(detail),
        },
    }
}
