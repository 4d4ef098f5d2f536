//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local LLM API.
//!
//! # Features
//!
//! - Availability probe against `/api/tags` with a short timeout
//! - Generation via `/api/generate` (non-streaming) with a long timeout
//! - JSON mode (`format: "json"`) for structured extraction
//! - Usage from `prompt_eval_count`/`eval_count`, estimated when absent
//!
//! # Examples
//!
//! ```no_run
//! use cropwise_llm::OllamaProvider;
//! use cropwise_domain::LlmProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.1");
//! if provider.is_available() {
//!     // ...
//! }
//! ```

use crate::{http, LlmError};
use cropwise_domain::{Generation, GenerationRequest, LlmProvider, Usage};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Timeout for the availability probe (seconds)
pub const PROBE_TIMEOUT_SECS: u64 = 2;

/// Timeout for generation requests (seconds); CPU inference is slow
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Context window used for models missing from the table
pub const DEFAULT_TOKEN_LIMIT: usize = 8192;

const TOKEN_LIMITS: &[(&str, usize)] = &[
    ("llama3.1", 128_000),
    ("llama3", 8192),
    ("llama2", 4096),
    ("mistral", 8192),
    ("mixtral", 32_768),
    ("phi3", 128_000),
    ("gemma", 8192),
];

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: Client,
    probe: Client,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.1", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: http::client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            probe: http::client(Duration::from_secs(PROBE_TIMEOUT_SECS)),
        }
    }

    /// Create a provider on `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Override the generation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::client(timeout);
        self
    }

    /// The configured endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::default_endpoint(DEFAULT_MODEL)
    }
}

fn token_limit_for(model: &str) -> usize {
    // "llama3.1:latest" -> "llama3.1"
    let base = model.split(':').next().unwrap_or(model);
    TOKEN_LIMITS
        .iter()
        .find(|(name, _)| *name == base)
        .map(|(_, limit)| *limit)
        .unwrap_or(DEFAULT_TOKEN_LIMIT)
}

fn usage_for(prompt: &str, response: &OllamaGenerateResponse) -> Usage {
    match (response.prompt_eval_count, response.eval_count) {
        (Some(input), Some(output)) => Usage::new(input, output),
        _ => Usage::estimate(prompt, &response.response),
    }
}

impl LlmProvider for OllamaProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self.probe.get(&url).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Ollama probe at {} failed: {}", url, e);
                false
            }
        }
    }

    fn token_limit(&self) -> usize {
        token_limit_for(&self.model)
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Generation, Self::Error> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            format: request.json_output.then_some("json"),
            options: OllamaOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            },
        };

        debug!("Sending request to Ollama model {} at {}", self.model, self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| http::transport_error("Ollama", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(http::status_error("Ollama", &self.model, status.as_u16(), &text));
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(Generation {
            usage: usage_for(&request.prompt, &parsed),
            text: parsed.response,
        })
    }
}
