//! Cropwise LLM Provider Layer
//!
//! Pluggable generative-model backends behind the `LlmProvider` trait from
//! `cropwise-domain`.
//!
//! # Providers
//!
//! - `ClaudeProvider`: Anthropic Messages API (cloud)
//! - `GeminiProvider`: Google Generative Language API (cloud)
//! - `OllamaProvider`: Local Ollama daemon
//! - `MockProvider`: Deterministic mock for testing
//!
//! All providers are synchronous. Raw transport and HTTP failures are mapped
//! to [`LlmError`], which classifies itself into a domain `ErrorKind`.
//!
//! # Examples
//!
//! ```
//! use cropwise_llm::MockProvider;
//! use cropwise_domain::{GenerationRequest, LlmProvider};
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate(&GenerationRequest::text("test prompt", 64)).unwrap();
//! assert_eq!(result.text, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod claude;
pub mod gemini;
mod http;
pub mod ollama;

use cropwise_domain::{Classify, ErrorKind, Generation, GenerationRequest, LlmProvider, Usage};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Network error or timeout
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response body from the backend
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded or backend overloaded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Quota or billing exhausted
    #[error("API quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Credential rejected
    #[error("Invalid or missing API key: {0}")]
    Authentication(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Backend cannot be called with the current settings
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl Classify for LlmError {
    fn kind(&self) -> ErrorKind {
        match self {
            LlmError::Communication(_) => ErrorKind::Transport,
            LlmError::RateLimitExceeded(_) => ErrorKind::RateLimited,
            LlmError::QuotaExceeded(_) => ErrorKind::Quota,
            LlmError::Authentication(_) => ErrorKind::Authentication,
            LlmError::ModelNotAvailable(_) => ErrorKind::ModelNotFound,
            LlmError::NotConfigured(_) => ErrorKind::Configuration,
            LlmError::InvalidResponse(msg) | LlmError::Other(msg) => ErrorKind::classify(msg),
        }
    }
}

/// A canned reply for [`MockProvider`]
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail(LlmError),
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<(String, MockReply)>,
    prompts: Vec<String>,
    max_tokens: Vec<u32>,
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls.
/// Rules added with [`add_response`](Self::add_response) match when the
/// prompt *contains* the given pattern; the first matching rule wins, and the
/// default reply is used otherwise. Clones share state.
///
/// # Examples
///
/// ```
/// use cropwise_llm::{LlmError, MockProvider};
/// use cropwise_domain::{GenerationRequest, LlmProvider};
///
/// let mut provider = MockProvider::new("fallback");
/// provider.add_response("wheat", "{\"crops\": []}");
/// provider.add_error("barley", LlmError::RateLimitExceeded("slow down".into()));
///
/// let ask = |p: &str| provider.generate(&GenerationRequest::text(p, 64));
/// assert_eq!(ask("tell me about wheat").unwrap().text, "{\"crops\": []}");
/// assert!(ask("barley please").is_err());
/// assert_eq!(ask("rice").unwrap().text, "fallback");
/// assert_eq!(provider.call_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    model: String,
    available: bool,
    token_limit: usize,
    default_reply: MockReply,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            name: "mock".to_string(),
            model: "mock-model".to_string(),
            available: true,
            token_limit: 8192,
            default_reply: MockReply::Text(response.into()),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create a MockProvider that fails every call with `error`
    pub fn failing(error: LlmError) -> Self {
        Self {
            default_reply: MockReply::Fail(error),
            ..Self::new("")
        }
    }

    /// Set the provider name reported by [`LlmProvider::name`]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set availability
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Set the reported token limit
    pub fn with_token_limit(mut self, token_limit: usize) -> Self {
        self.token_limit = token_limit;
        self
    }

    /// Respond with `response` when the prompt contains `pattern`
    pub fn add_response(&mut self, pattern: impl Into<String>, response: impl Into<String>) {
        self.lock()
            .rules
            .push((pattern.into(), MockReply::Text(response.into())));
    }

    /// Fail with `error` when the prompt contains `pattern`
    pub fn add_error(&mut self, pattern: impl Into<String>, error: LlmError) {
        self.lock().rules.push((pattern.into(), MockReply::Fail(error)));
    }

    /// Number of times generate was called
    pub fn call_count(&self) -> usize {
        self.lock().prompts.len()
    }

    /// Reset the call count and recorded prompts
    pub fn reset_call_count(&self) {
        let mut state = self.lock();
        state.prompts.clear();
        state.max_tokens.clear();
    }

    /// The most recent prompt, if any
    pub fn last_prompt(&self) -> Option<String> {
        self.lock().prompts.last().cloned()
    }

    /// Completion cap of the most recent request, if any
    pub fn last_max_tokens(&self) -> Option<u32> {
        self.lock().max_tokens.last().copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // a panicking test thread must not poison the other clones
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProvider for MockProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn token_limit(&self) -> usize {
        self.token_limit
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Generation, Self::Error> {
        let mut state = self.lock();
        state.prompts.push(request.prompt.clone());
        state.max_tokens.push(request.max_tokens);

        let reply = state
            .rules
            .iter()
            .find(|(pattern, _)| request.prompt.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default_reply.clone());

        match reply {
            MockReply::Text(text) => Ok(Generation {
                usage: Usage::estimate(&request.prompt, &text),
                text,
            }),
            MockReply::Fail(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(provider: &MockProvider, prompt: &str) -> Result<Generation, LlmError> {
        provider.generate(&GenerationRequest::text(prompt, 128))
    }

    #[test]
    fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = ask(&provider, "any prompt").unwrap();
        assert_eq!(result.text, "Test response");
        assert!(result.usage.estimated);
    }

    #[test]
    fn test_mock_provider_first_matching_rule_wins() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("hello there", "never");

        assert_eq!(ask(&provider, "well hello there").unwrap().text, "world");
        assert_eq!(
            ask(&provider, "unknown").unwrap().text,
            "Default mock response"
        );
    }

    #[test]
    fn test_mock_provider_call_count_and_last_prompt() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);
        assert_eq!(provider.last_prompt(), None);

        ask(&provider, "prompt1").unwrap();
        ask(&provider, "prompt2").unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.last_prompt().as_deref(), Some("prompt2"));

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_mock_provider_failing() {
        let provider = MockProvider::failing(LlmError::QuotaExceeded("billing".into()))
            .with_name("gemini")
            .with_model("gemini-2.5-flash");
        let err = ask(&provider, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Quota);
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), "gemini-2.5-flash");
    }

    #[test]
    fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        ask(&provider1, "test").unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
        assert_eq!(provider2.last_max_tokens(), Some(128));

        provider2.reset_call_count();
        assert_eq!(provider1.last_max_tokens(), None);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            LlmError::Communication("timed out".into()).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            LlmError::NotConfigured("no key".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            LlmError::Other("You exceeded your current quota".into()).kind(),
            ErrorKind::Quota
        );
        assert_eq!(
            LlmError::ModelNotAvailable("llama9".into()).kind(),
            ErrorKind::ModelNotFound
        );
    }
}
