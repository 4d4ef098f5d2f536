//! Construction of backend adapters from settings

use crate::adapter::{ExtractionAdapter, ProviderAdapter, DEFAULT_MAX_OUTPUT_TOKENS};
use crate::config::{BackendSettings, ProviderSettings, ProviderStrategy, RemovalScope};
use crate::orchestrator::Orchestrator;
use cropwise_llm::{ollama, ClaudeProvider, GeminiProvider, OllamaProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// The concrete backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Claude
    Claude,
    /// Google Gemini
    Gemini,
    /// Local Ollama daemon
    Ollama,
}

impl ProviderKind {
    /// Every backend, in auto-configuration order
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Claude, ProviderKind::Gemini, ProviderKind::Ollama];

    /// Backend name as reported by its adapter
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
        }
    }

    fn unavailable_hint(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "set ANTHROPIC_API_KEY",
            ProviderKind::Gemini => "set GOOGLE_API_KEY",
            ProviderKind::Ollama => "install and start the Ollama service",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "ollama" | "local" => Ok(ProviderKind::Ollama),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// Builds a one-off adapter from a caller-supplied credential
pub trait AdapterFactory {
    /// Adapter authenticated with `credential`
    fn for_credential(&self, credential: &str) -> Box<dyn ProviderAdapter>;
}

impl<F> AdapterFactory for F
where
    F: Fn(&str) -> Box<dyn ProviderAdapter>,
{
    fn for_credential(&self, credential: &str) -> Box<dyn ProviderAdapter> {
        self(credential)
    }
}

/// Creates adapters for every backend from [`ProviderSettings`]
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    settings: ProviderSettings,
    max_output_tokens: u32,
    credential_kind: ProviderKind,
}

impl ProviderRegistry {
    /// Create a registry; caller credentials default to Gemini keys
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            credential_kind: ProviderKind::Gemini,
        }
    }

    /// Completion cap for created adapters
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Backend that caller-supplied credentials are for
    pub fn with_credential_kind(mut self, kind: ProviderKind) -> Self {
        self.credential_kind = kind;
        self
    }

    /// The settings in use
    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Adapter for `kind` using the configured settings
    pub fn create(&self, kind: ProviderKind) -> Box<dyn ProviderAdapter> {
        let backend = match kind {
            ProviderKind::Claude => &self.settings.claude,
            ProviderKind::Gemini => &self.settings.gemini,
            ProviderKind::Ollama => &self.settings.ollama,
        };
        self.build(kind, backend)
    }

    /// Adapter for `kind` with `api_key` replacing the configured key
    pub fn create_with_key(&self, kind: ProviderKind, api_key: &str) -> Box<dyn ProviderAdapter> {
        let mut backend = match kind {
            ProviderKind::Claude => self.settings.claude.clone(),
            ProviderKind::Gemini => self.settings.gemini.clone(),
            ProviderKind::Ollama => self.settings.ollama.clone(),
        };
        backend.api_key = Some(api_key.to_string());
        self.build(kind, &backend)
    }

    fn build(&self, kind: ProviderKind, backend: &BackendSettings) -> Box<dyn ProviderAdapter> {
        match kind {
            ProviderKind::Claude => {
                let mut provider = ClaudeProvider::new(backend.api_key.clone(), backend.model.clone());
                if let Some(url) = &backend.base_url {
                    provider = provider.with_base_url(url.as_str());
                }
                if let Some(timeout) = backend.timeout() {
                    provider = provider.with_timeout(timeout);
                }
                self.wrap(provider)
            }
            ProviderKind::Gemini => {
                let mut provider = GeminiProvider::new(backend.api_key.clone(), backend.model.clone());
                if let Some(url) = &backend.base_url {
                    provider = provider.with_base_url(url.as_str());
                }
                if let Some(timeout) = backend.timeout() {
                    provider = provider.with_timeout(timeout);
                }
                self.wrap(provider)
            }
            ProviderKind::Ollama => {
                let endpoint = backend
                    .base_url
                    .clone()
                    .unwrap_or_else(|| ollama::DEFAULT_ENDPOINT.to_string());
                let model = backend
                    .model
                    .clone()
                    .unwrap_or_else(|| ollama::DEFAULT_MODEL.to_string());
                let mut provider = OllamaProvider::new(endpoint, model);
                if let Some(timeout) = backend.timeout() {
                    provider = provider.with_timeout(timeout);
                }
                self.wrap(provider)
            }
        }
    }

    fn wrap<P>(&self, provider: P) -> Box<dyn ProviderAdapter>
    where
        P: cropwise_domain::LlmProvider + 'static,
    {
        Box::new(ExtractionAdapter::new(provider).with_max_output_tokens(self.max_output_tokens))
    }

    /// Adapters for every backend that is currently available
    pub fn auto_configure(&self) -> Vec<Box<dyn ProviderAdapter>> {
        info!("Auto-configuring LLM providers");
        let mut adapters = Vec::new();
        for kind in ProviderKind::ALL {
            let adapter = self.create(kind);
            if adapter.available() {
                info!("{} configured (model: {})", kind, adapter.model());
                adapters.push(adapter);
            } else {
                info!("{} not available: {}", kind, kind.unavailable_hint());
            }
        }
        if adapters.is_empty() {
            warn!("No LLM providers available; configure Claude, Gemini or Ollama");
        }
        adapters
    }

    /// Orchestrator over the auto-configured providers
    pub fn orchestrator(&self, strategy: ProviderStrategy, removal: RemovalScope) -> Orchestrator {
        Orchestrator::new(self.auto_configure(), strategy).with_removal_scope(removal)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(ProviderSettings::default().with_env_keys())
    }
}

impl AdapterFactory for ProviderRegistry {
    fn for_credential(&self, credential: &str) -> Box<dyn ProviderAdapter> {
        self.create_with_key(self.credential_kind, credential)
    }
}
