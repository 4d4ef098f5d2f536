//! Claude Provider Implementation
//!
//! Calls Anthropic's Messages API (`POST /v1/messages`) with the `x-api-key`
//! and `anthropic-version` headers. The provider reports itself unavailable
//! when no API key is configured.
//!
//! # Examples
//!
//! ```no_run
//! use cropwise_llm::ClaudeProvider;
//! use cropwise_domain::{GenerationRequest, LlmProvider};
//!
//! let provider = ClaudeProvider::new(Some("sk-ant-...".to_string()), None);
//! let reply = provider.generate(&GenerationRequest::text("Say hello", 32));
//! ```

use crate::{http, LlmError};
use cropwise_domain::{Generation, GenerationRequest, LlmProvider, Usage};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Default Anthropic API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Default model
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// API version header value
pub const API_VERSION: &str = "2023-06-01";

/// Default timeout for generation requests (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Context window used for models missing from the table
pub const DEFAULT_TOKEN_LIMIT: usize = 200_000;

const TOKEN_LIMITS: &[(&str, usize)] = &[
    ("claude-3-5-sonnet-20241022", 200_000),
    ("claude-3-opus-20240229", 200_000),
    ("claude-3-sonnet-20240229", 200_000),
    ("claude-3-haiku-20240307", 200_000),
];

/// Anthropic Claude provider
pub struct ClaudeProvider {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: Client,
}

impl ClaudeProvider {
    /// Create a provider; `model` defaults to [`DEFAULT_MODEL`]
    pub fn new(api_key: Option<String>, model: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: http::client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Override the API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::client(timeout);
        self
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "messages": [{"role": "user", "content": request.prompt}],
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }
}

/// Parse a Messages API response body
pub(crate) fn parse_response(body: &Value) -> Result<Generation, LlmError> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::InvalidResponse("Claude response has no content".to_string()))?;

    let text: String = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str).unwrap_or("text") == "text")
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(LlmError::InvalidResponse(
            "Claude response has no text content".to_string(),
        ));
    }

    let count = |field: &str| {
        body.get("usage")
            .and_then(|u| u.get(field))
            .and_then(Value::as_u64)
    };
    let usage = match (count("input_tokens"), count("output_tokens")) {
        (Some(input), Some(output)) => Usage::new(input, output),
        _ => Usage::estimate("", &text),
    };

    Ok(Generation { text, usage })
}

fn token_limit_for(model: &str) -> usize {
    TOKEN_LIMITS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, limit)| *limit)
        .unwrap_or(DEFAULT_TOKEN_LIMIT)
}

impl LlmProvider for ClaudeProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "claude"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn token_limit(&self) -> usize {
        token_limit_for(&self.model)
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Generation, Self::Error> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            LlmError::NotConfigured("Claude API key not configured".to_string())
        })?;

        let url = format!("{}/v1/messages", self.base_url);
        debug!("Sending request to Claude model {}", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.request_body(request))
            .send()
            .map_err(|e| http::transport_error("Claude", e))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| http::transport_error("Claude", e))?;

        if !status.is_success() {
            return Err(http::status_error("Claude", &self.model, status.as_u16(), &text));
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse Claude response: {}", e)))?;
        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropwise_domain::{Classify, ErrorKind};

    #[test]
    fn test_unavailable_without_key() {
        let provider = ClaudeProvider::new(None, None);
        assert!(!provider.is_available());
        assert_eq!(provider.model(), DEFAULT_MODEL);

        let blank = ClaudeProvider::new(Some("  ".to_string()), None);
        assert!(!blank.is_available());

        let err = provider
            .generate(&GenerationRequest::text("hi", 8))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_token_limit_lookup() {
        let known = ClaudeProvider::new(None, Some("claude-3-haiku-20240307".into()));
        assert_eq!(known.token_limit(), 200_000);
        let unknown = ClaudeProvider::new(None, Some("claude-next".into()));
        assert_eq!(unknown.token_limit(), DEFAULT_TOKEN_LIMIT);
    }

    #[test]
    fn test_request_body_shape() {
        let provider = ClaudeProvider::new(Some("k".into()), None);
        let body = provider.request_body(&GenerationRequest::text("hello", 100).with_temperature(0.2));
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert!(body.get("temperature").is_some());
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "content": [{"type": "text", "text": "{\"crops\": "}, {"type": "text", "text": "[]}"}],
            "usage": {"input_tokens": 12, "output_tokens": 4}
        });
        let generation = parse_response(&body).unwrap();
        assert_eq!(generation.text, "{\"crops\": []}");
        assert_eq!(generation.usage, Usage::new(12, 4));
    }

    #[test]
    fn test_parse_response_without_content() {
        let err = parse_response(&json!({"id": "msg_1"})).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider = ClaudeProvider::new(None, None).with_base_url("http://proxy/");
        assert_eq!(provider.base_url, "http://proxy");
    }

    #[test]
    #[ignore] // requires ANTHROPIC_API_KEY and network access
    fn test_claude_generate_integration() {
        let provider = ClaudeProvider::new(std::env::var("ANTHROPIC_API_KEY").ok(), None);
        let result = provider.generate(&GenerationRequest::text("Say 'hello' and nothing else", 16));
        assert!(result.is_ok());
    }
}
