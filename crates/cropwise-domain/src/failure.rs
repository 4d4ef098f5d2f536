//! Tagged classification of provider and pipeline failures
//!
//! Backends report errors as free text (HTTP bodies, SDK messages). Those are
//! mapped onto [`ErrorKind`] once, at the adapter boundary, so callers can
//! branch on the kind instead of matching strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure categories shared across the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing credential or invalid settings
    Configuration,
    /// Network error or timeout
    Transport,
    /// Rate limited or backend overloaded
    RateLimited,
    /// Quota or billing exhausted
    Quota,
    /// Credential rejected
    Authentication,
    /// Requested model does not exist
    ModelNotFound,
    /// Model output could not be repaired into an object
    MalformedOutput,
    /// Retrieval returned nothing
    EmptyRetrieval,
    /// Anything else
    Other,
}

impl ErrorKind {
    /// Classify a raw error message
    ///
    /// # Examples
    ///
    /// ```
    /// use cropwise_domain::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::classify("429 Too Many Requests"), ErrorKind::RateLimited);
    /// assert_eq!(ErrorKind::classify("Invalid API key"), ErrorKind::Authentication);
    /// assert_eq!(ErrorKind::classify("something odd"), ErrorKind::Other);
    /// ```
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["quota", "billing", "credit balance", "insufficient credit"]) {
            ErrorKind::Quota
        } else if has(&["rate limit", "rate_limit", "429", "overloaded", "too many requests"]) {
            ErrorKind::RateLimited
        } else if has(&[
            "api key",
            "api_key",
            "unauthorized",
            "401",
            "403",
            "authentication",
            "permission denied",
        ]) {
            ErrorKind::Authentication
        } else if has(&["not found", "404", "not_found_error"]) {
            ErrorKind::ModelNotFound
        } else if has(&["timed out", "timeout", "connection", "connect error", "dns"]) {
            ErrorKind::Transport
        } else {
            ErrorKind::Other
        }
    }

    /// True for rate-limit and quota failures
    pub fn is_rate_or_quota(&self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::Quota)
    }

    /// Stable lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Transport => "transport",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Quota => "quota",
            ErrorKind::Authentication => "authentication",
            ErrorKind::ModelNotFound => "model_not_found",
            ErrorKind::MalformedOutput => "malformed_output",
            ErrorKind::EmptyRetrieval => "empty_retrieval",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that know their [`ErrorKind`]
pub trait Classify {
    /// The failure category
    fn kind(&self) -> ErrorKind;
}

/// A classified failure carried as data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    /// Category
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
}

impl ProviderFailure {
    /// Create a failure with an explicit kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a failure, classifying the message text
    pub fn classified(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ErrorKind::classify(&message),
            message,
        }
    }

    /// Build from any classified error
    pub fn from_error<E: fmt::Display + Classify>(error: &E) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderFailure {}

impl Classify for ProviderFailure {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}
