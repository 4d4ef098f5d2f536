//! Gemini Provider Implementation
//!
//! Calls the Generative Language API
//! (`POST /v1beta/models/{model}:generateContent`) with the key in the
//! `x-goog-api-key` header. JSON output is requested through
//! `responseMimeType` when the request asks for it.

use crate::{http, LlmError};
use cropwise_domain::{Generation, GenerationRequest, LlmProvider, Usage};
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Default Generative Language API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default timeout for generation requests (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Context window used for models missing from the table
pub const DEFAULT_TOKEN_LIMIT: usize = 32_760;

const TOKEN_LIMITS: &[(&str, usize)] = &[
    ("gemini-2.5-pro", 1_048_576),
    ("gemini-2.5-flash", 1_048_576),
    ("gemini-2.0-flash", 1_048_576),
    ("gemini-2.0-flash-exp", 1_048_576),
    ("gemini-1.5-pro", 2_000_000),
    ("gemini-1.5-flash", 1_000_000),
    ("gemini-pro", 32_000),
];

/// Google Gemini provider
pub struct GeminiProvider {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
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
        let mut config = json!({ "maxOutputTokens": request.max_tokens });
        if let Some(temperature) = request.temperature {
            config["temperature"] = json!(temperature);
        }
        if request.json_output {
            config["responseMimeType"] = json!("application/json");
        }
        json!({
            "contents": [{"role": "user", "parts": [{"text": request.prompt}]}],
            "generationConfig": config,
        })
    }

    /// Rewrite an error with guidance for the common Gemini failures
    fn explain(&self, error: LlmError) -> LlmError {
        match error {
            LlmError::ModelNotAvailable(detail) => LlmError::ModelNotAvailable(format!(
                "Model '{}' not found. Try 'gemini-2.5-flash', 'gemini-2.5-pro', or 'gemini-2.0-flash'. ({})",
                self.model, detail
            )),
            other => other,
        }
    }
}

/// Parse a generateContent response body
///
/// Usage falls back to a word-count estimate when `usageMetadata` is absent.
pub(crate) fn parse_response(prompt: &str, body: &Value) -> Result<Generation, LlmError> {
    let candidate = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .ok_or_else(|| {
            let reason = body
                .get("promptFeedback")
                .and_then(|f| f.get("blockReason"))
                .and_then(Value::as_str)
                .unwrap_or("no candidates");
            LlmError::InvalidResponse(format!("Gemini returned no output: {}", reason))
        })?;

    let text: String = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .unwrap_or("empty");
        return Err(LlmError::InvalidResponse(format!(
            "Gemini candidate has no text (finish reason: {})",
            reason
        )));
    }

    let metadata = body.get("usageMetadata");
    let count = |field: &str| metadata.and_then(|m| m.get(field)).and_then(Value::as_u64);
    let usage = match (count("promptTokenCount"), count("candidatesTokenCount")) {
        (Some(input), Some(output)) => Usage::new(input, output),
        _ => Usage::estimate(prompt, &text),
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

impl LlmProvider for GeminiProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "gemini"
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
            LlmError::NotConfigured("Gemini API key not configured".to_string())
        })?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        debug!("Sending request to Gemini model {}", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&self.request_body(request))
            .send()
            .map_err(|e| http::transport_error("Gemini", e))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| http::transport_error("Gemini", e))?;

        if !status.is_success() {
            let error = http::status_error("Gemini", &self.model, status.as_u16(), &text);
            return Err(self.explain(error));
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse Gemini response: {}", e)))?;
        parse_response(&request.prompt, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropwise_domain::{Classify, ErrorKind};

    #[test]
    fn test_defaults_and_availability() {
        let provider = GeminiProvider::new(None, None);
        assert!(!provider.is_available());
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), DEFAULT_MODEL);
        assert_eq!(provider.token_limit(), 1_048_576);

        let keyed = GeminiProvider::new(Some("AIza".into()), Some("gemini-custom".into()));
        assert!(keyed.is_available());
        assert_eq!(keyed.token_limit(), DEFAULT_TOKEN_LIMIT);
    }

    #[test]
    fn test_request_body_json_mode() {
        let provider = GeminiProvider::new(Some("k".into()), None);
        let body = provider.request_body(&GenerationRequest::json("extract", 4096).with_temperature(0.1));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "extract");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");

        let plain = provider.request_body(&GenerationRequest::text("answer", 512));
        assert!(plain["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_parse_response_with_usage() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "Rice needs water."}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 4, "totalTokenCount": 11}
        });
        let generation = parse_response("q", &body).unwrap();
        assert_eq!(generation.text, "Rice needs water.");
        assert_eq!(generation.usage.total(), 11);
        assert!(!generation.usage.estimated);
    }

    #[test]
    fn test_parse_response_estimates_usage() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "one two"}]}}]});
        let generation = parse_response("a b c d e f g h i j", &body).unwrap();
        assert!(generation.usage.estimated);
        assert_eq!(generation.usage.input_tokens, 13);
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = parse_response("q", &body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_model_not_found_guidance() {
        let provider = GeminiProvider::new(Some("k".into()), Some("gemini-9".into()));
        let err = provider.explain(http::status_error("Gemini", "gemini-9", 404, "not found"));
        assert_eq!(err.kind(), ErrorKind::ModelNotFound);
        assert!(err.to_string().contains("gemini-2.5-flash"));
    }

    #[test]
    #[ignore] // requires GOOGLE_API_KEY and network access
    fn test_gemini_generate_integration() {
        let provider = GeminiProvider::new(std::env::var("GOOGLE_API_KEY").ok(), None);
        let result = provider.generate(&GenerationRequest::text("Say 'hello' and nothing else", 16));
        assert!(result.is_ok());
    }
}
