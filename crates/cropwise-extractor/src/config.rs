//! Configuration for the Extractor

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the orchestrator picks the next provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStrategy {
    /// First available provider; failed providers are dropped and the next is tried
    #[default]
    Failover,
    /// Rotate through available providers
    RoundRobin,
    /// Cheapest first: ollama, gemini, claude
    #[serde(rename = "cost_optimized")]
    CostPriority,
    /// Strongest first: claude, gemini, ollama
    #[serde(rename = "performance")]
    PerformancePriority,
}

impl ProviderStrategy {
    /// Stable label
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderStrategy::Failover => "failover",
            ProviderStrategy::RoundRobin => "round_robin",
            ProviderStrategy::CostPriority => "cost_optimized",
            ProviderStrategy::PerformancePriority => "performance",
        }
    }

    /// Provider names in preference order, for the priority strategies
    pub fn priority(&self) -> &'static [&'static str] {
        match self {
            ProviderStrategy::CostPriority => &["ollama", "gemini", "claude"],
            ProviderStrategy::PerformancePriority => &["claude", "gemini", "ollama"],
            _ => &[],
        }
    }
}

impl fmt::Display for ProviderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "failover" => Ok(ProviderStrategy::Failover),
            "round_robin" | "round-robin" => Ok(ProviderStrategy::RoundRobin),
            "cost_optimized" | "cost" => Ok(ProviderStrategy::CostPriority),
            "performance" => Ok(ProviderStrategy::PerformancePriority),
            other => Err(format!("Unknown provider strategy: {}", other)),
        }
    }
}

/// How long a provider that failed under failover stays out of the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalScope {
    /// Removed for the lifetime of the orchestrator
    #[default]
    Instance,
    /// Skipped for the rest of the current call only
    Call,
}

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum input text length (characters)
    pub max_text_length: usize,

    /// Token budget per chunk
    pub max_chunk_tokens: usize,

    /// Extra provider attempts after the first failure
    pub max_retries: usize,

    /// Provider selection strategy
    pub strategy: ProviderStrategy,

    /// Lifetime of failover removals
    pub removal_scope: RemovalScope,

    /// Completion token cap per extraction call
    pub max_output_tokens: u32,

    /// Merge chunk fragments into entities instead of returning them raw
    pub combine_results: bool,
}

impl ExtractorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_text_length == 0 {
            return Err("max_text_length must be greater than 0".to_string());
        }
        if self.max_chunk_tokens == 0 {
            return Err("max_chunk_tokens must be greater than 0".to_string());
        }
        if self.max_chunk_tokens * cropwise_domain::chunk::CHARS_PER_TOKEN > self.max_text_length {
            return Err("max_chunk_tokens cannot exceed max_text_length".to_string());
        }
        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Aggressive preset: small chunks, one retry
    pub fn aggressive() -> Self {
        Self {
            max_text_length: 200_000,
            max_chunk_tokens: 500,
            max_retries: 1,
            strategy: ProviderStrategy::CostPriority,
            removal_scope: RemovalScope::Instance,
            max_output_tokens: 2048,
            combine_results: true,
        }
    }

    /// Lenient preset: large chunks, more retries
    pub fn lenient() -> Self {
        Self {
            max_text_length: 2_000_000,
            max_chunk_tokens: 2000,
            max_retries: 4,
            strategy: ProviderStrategy::Failover,
            removal_scope: RemovalScope::Call,
            max_output_tokens: 8192,
            combine_results: true,
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_text_length: 1_000_000,
            max_chunk_tokens: 1000,
            max_retries: 2,
            strategy: ProviderStrategy::Failover,
            removal_scope: RemovalScope::Instance,
            max_output_tokens: 4096,
            combine_results: true,
        }
    }
}

/// Settings for one backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// API key (cloud backends)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Endpoint override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout override (seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl BackendSettings {
    /// The timeout override as a Duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Credentials and endpoints for every backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Anthropic Claude
    pub claude: BackendSettings,

    /// Google Gemini
    pub gemini: BackendSettings,

    /// Local Ollama daemon
    pub ollama: BackendSettings,
}

impl ProviderSettings {
    /// Fill missing API keys from `ANTHROPIC_API_KEY` and `GOOGLE_API_KEY`
    pub fn with_env_keys(mut self) -> Self {
        if self.claude.api_key.is_none() {
            self.claude.api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }
        if self.gemini.api_key.is_none() {
            self.gemini.api_key = std::env::var("GOOGLE_API_KEY").ok();
        }
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        for (name, backend) in [
            ("claude", &self.claude),
            ("gemini", &self.gemini),
            ("ollama", &self.ollama),
        ] {
            if backend.timeout_secs == Some(0) {
                return Err(format!("{}.timeout_secs must be greater than 0", name));
            }
            if let Some(url) = &backend.base_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(format!("{}.base_url must be an http(s) URL", name));
                }
            }
        }
        Ok(())
    }

    /// Load settings from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize settings to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_chunk_tokens, 1000);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_output_tokens, 4096);
        assert!(config.combine_results);
        assert_eq!(config.removal_scope, RemovalScope::Instance);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(ExtractorConfig::aggressive().validate().is_ok());
        assert!(ExtractorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = ExtractorConfig::default();
        config.max_chunk_tokens = 0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.max_text_length = 100;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.max_output_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::lenient();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("strategy = \"failover\""));
        assert!(toml_str.contains("removal_scope = \"call\""));
        assert_eq!(ExtractorConfig::from_toml(&toml_str).unwrap(), config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ExtractorConfig::from_toml("strategy = \"cost_optimized\"\nmax_retries = 5").unwrap();
        assert_eq!(config.strategy, ProviderStrategy::CostPriority);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_chunk_tokens, 1000);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("round-robin".parse::<ProviderStrategy>(), Ok(ProviderStrategy::RoundRobin));
        assert_eq!(
            "PERFORMANCE".parse::<ProviderStrategy>(),
            Ok(ProviderStrategy::PerformancePriority)
        );
        assert!("fastest".parse::<ProviderStrategy>().is_err());
        assert_eq!(ProviderStrategy::CostPriority.priority(), &["ollama", "gemini", "claude"]);
        assert!(ProviderStrategy::Failover.priority().is_empty());
    }

    #[test]
    fn test_provider_settings_toml() {
        let settings = ProviderSettings::from_toml(
            "[ollama]\nbase_url = \"http://gpu-box:11434\"\nmodel = \"mistral\"\ntimeout_secs = 300\n",
        )
        .unwrap();
        assert_eq!(settings.ollama.model.as_deref(), Some("mistral"));
        assert_eq!(settings.ollama.timeout(), Some(Duration::from_secs(300)));
        assert!(settings.claude.api_key.is_none());
        assert!(settings.validate().is_ok());

        let round = ProviderSettings::from_toml(&settings.to_toml().unwrap()).unwrap();
        assert_eq!(round, settings);
    }

    #[test]
    fn test_provider_settings_validation() {
        let mut settings = ProviderSettings::default();
        settings.gemini.base_url = Some("ftp://nope".to_string());
        assert!(settings.validate().is_err());

        let mut settings = ProviderSettings::default();
        settings.claude.timeout_secs = Some(0);
        assert!(settings.validate().is_err());
    }
}
