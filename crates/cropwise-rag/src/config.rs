//! Configuration for the AnswerGenerator

use serde::{Deserialize, Serialize};

/// Answer returned when retrieval finds nothing
pub const NO_INFORMATION_ANSWER: &str = "I don't have information about that crop in my database. Please try asking about a different crop.";

/// Configuration for the AnswerGenerator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    /// Completion token cap per answer
    pub max_output_tokens: u32,

    /// Items shown per list section of an entity summary
    pub list_cap: usize,

    /// Answer returned when no entity matches the query
    pub no_info_answer: String,
}

impl AnswerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be greater than 0".to_string());
        }
        if self.list_cap == 0 {
            return Err("list_cap must be greater than 0".to_string());
        }
        if self.no_info_answer.trim().is_empty() {
            return Err("no_info_answer cannot be empty".to_string());
        }
        Ok(())
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

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 1024,
            list_cap: 5,
            no_info_answer: NO_INFORMATION_ANSWER.to_string(),
        }
    }
}
