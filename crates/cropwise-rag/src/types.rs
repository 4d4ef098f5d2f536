//! Query and answer contracts

use cropwise_domain::{EntityRecord, ErrorKind};
use serde::{Deserialize, Serialize};

fn default_top_k() -> usize {
    3
}

fn default_include_context() -> bool {
    true
}

/// A question for the AnswerGenerator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User question
    pub query: String,

    /// Entities to retrieve
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Return the rendered context with the answer
    #[serde(default = "default_include_context")]
    pub include_context: bool,

    /// Caller credential for a one-off adapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ChatRequest {
    /// Request with default `top_k` and context included
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: default_top_k(),
            include_context: default_include_context(),
            api_key: None,
        }
    }

    /// Set the number of entities retrieved
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set whether the context is returned
    pub fn with_context(mut self, include_context: bool) -> Self {
        self.include_context = include_context;
        self
    }

    /// Use the caller's own credential
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Answer to a [`ChatRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated answer, or the raw context when generation was skipped or failed
    pub answer: String,

    /// Entity and variant names used as context
    pub entities_used: Vec<String>,

    /// Rendered context, when requested
    pub context: Option<String>,

    /// Whether a model produced `answer`
    pub llm_used: bool,

    /// Provider that answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Generation error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Classified failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

/// One entity with its rendered summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityInfo {
    /// Merged record
    pub record: EntityRecord,

    /// Linked variant records
    pub variants: Vec<EntityRecord>,

    /// Summary as placed in answer context
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_from_json() {
        let request: ChatRequest = serde_json::from_str(r#"{"query": "rice"}"#).unwrap();
        assert_eq!(request, ChatRequest::new("rice"));
        assert_eq!(request.top_k, 3);
        assert!(request.include_context);
    }

    #[test]
    fn test_response_omits_empty_optionals() {
        let response = ChatResponse {
            answer: "ok".to_string(),
            entities_used: vec!["Rice".to_string()],
            context: None,
            llm_used: true,
            provider: None,
            error: None,
            error_kind: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "answer": "ok",
                "entities_used": ["Rice"],
                "context": null,
                "llm_used": true
            })
        );
    }
}
