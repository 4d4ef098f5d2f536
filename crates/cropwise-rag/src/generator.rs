//! Retrieval-augmented answers

use crate::config::AnswerConfig;
use crate::context::{build_context, entity_summary};
use crate::error::RagError;
use crate::prompt::answer_prompt;
use crate::types::{ChatRequest, ChatResponse, EntityInfo};
use cropwise_domain::{EntityCollection, ErrorKind, ProviderFailure};
use cropwise_extractor::{AdapterFactory, ProviderAdapter};
use cropwise_store::{KnowledgeStore, RetrievalEngine};
use tracing::{debug, info, warn};

const QUOTA_HINT: &str = "\n\nTip: The backend API key quota may be exhausted. Try providing your own API key in the request.";
const AUTH_HINT: &str = "\n\nTip: The API key was rejected. Check the key and try again.";

/// Answers questions from a knowledge store
///
/// The store is loaded on construction and read-only afterwards, apart from
/// [`store_mut`](Self::store_mut) for merging new records.
pub struct AnswerGenerator<C: EntityCollection> {
    store: KnowledgeStore<C>,
    default_adapter: Option<Box<dyn ProviderAdapter>>,
    factory: Option<Box<dyn AdapterFactory>>,
    config: AnswerConfig,
}

enum Selected<'a> {
    Borrowed(&'a dyn ProviderAdapter),
    Owned(Box<dyn ProviderAdapter>),
}

impl Selected<'_> {
    fn adapter(&self) -> &dyn ProviderAdapter {
        match self {
            Selected::Borrowed(adapter) => *adapter,
            Selected::Owned(adapter) => adapter.as_ref(),
        }
    }
}

impl<C: EntityCollection> AnswerGenerator<C> {
    /// Create a generator, loading `store` if needed
    pub fn new(mut store: KnowledgeStore<C>, config: AnswerConfig) -> Result<Self, RagError> {
        config.validate().map_err(RagError::Config)?;
        store.load()?;
        Ok(Self {
            store,
            default_adapter: None,
            factory: None,
            config,
        })
    }

    /// Adapter used when the caller brings no credential
    pub fn with_default_adapter(mut self, adapter: Box<dyn ProviderAdapter>) -> Self {
        self.default_adapter = Some(adapter);
        self
    }

    /// Factory for one-off adapters built from caller credentials
    pub fn with_factory(mut self, factory: Box<dyn AdapterFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Current configuration
    pub fn config(&self) -> &AnswerConfig {
        &self.config
    }

    /// The knowledge store
    pub fn store(&self) -> &KnowledgeStore<C> {
        &self.store
    }

    /// Mutable access to the knowledge store
    pub fn store_mut(&mut self) -> &mut KnowledgeStore<C> {
        &mut self.store
    }

    /// Whether answers can be generated without a caller credential
    pub fn is_available(&self) -> bool {
        self.default_adapter.as_ref().is_some_and(|a| a.available())
    }

    /// Answer `request`
    ///
    /// Never fails: generation problems come back as a degraded answer
    /// holding the raw context.
    pub fn chat(&self, request: &ChatRequest) -> ChatResponse {
        let hits = RetrievalEngine::new(&self.store).search(&request.query, request.top_k);
        if hits.is_empty() {
            debug!("No entities matched '{}'", request.query);
            return ChatResponse {
                answer: self.config.no_info_answer.clone(),
                entities_used: Vec::new(),
                context: None,
                llm_used: false,
                provider: None,
                error: None,
                error_kind: Some(ErrorKind::EmptyRetrieval),
            };
        }

        let document = build_context(&hits, self.config.list_cap);
        let context = request.include_context.then(|| document.text.clone());
        let mut response = ChatResponse {
            answer: String::new(),
            entities_used: document.entities_used,
            context,
            llm_used: false,
            provider: None,
            error: None,
            error_kind: None,
        };

        let selected = match self.select_adapter(request.api_key.as_deref()) {
            Some(selected) => selected,
            None => {
                debug!("No generation adapter available; returning raw context");
                response.answer = format!("Here's what I found:\n\n{}", document.text);
                return response;
            }
        };
        let adapter = selected.adapter();

        if !adapter.available() {
            let message = format!("Provider {} is not available", adapter.provider_name());
            warn!("Caller credential produced an unusable adapter: {}", message);
            response.answer = format!(
                "Invalid API key provided: {}\n\nPlease check your API key and try again.",
                message
            );
            response.error = Some(format!("Invalid API key: {}", message));
            response.error_kind = Some(ErrorKind::Authentication);
            return response;
        }

        let prompt = answer_prompt(&request.query, &document.text);
        match adapter.complete(&prompt, self.config.max_output_tokens) {
            Ok(completion) => {
                info!(
                    "Answered with {} ({}) using {} entities, {} tokens",
                    completion.provider,
                    completion.model,
                    response.entities_used.len(),
                    completion.usage.total()
                );
                response.answer = completion.text.trim().to_string();
                response.llm_used = true;
                response.provider = Some(completion.provider);
            }
            Err(failure) => {
                let kind = failure_kind(&failure);
                warn!(
                    "Generation with {} failed ({}): {}",
                    adapter.provider_name(),
                    kind,
                    failure.message
                );
                response.answer = format!(
                    "Error generating response: {}{}\n\nHere's the raw data:\n\n{}",
                    failure.message,
                    hint(kind),
                    document.text
                );
                response.provider = Some(adapter.provider_name().to_string());
                response.error = Some(failure.message);
                response.error_kind = Some(kind);
            }
        }
        response
    }

    /// Record and rendered summary for `name`
    pub fn entity_info(&self, name: &str) -> Option<EntityInfo> {
        let entity = self.store.get(name)?;
        Some(EntityInfo {
            record: entity.record.clone(),
            variants: entity.variants.clone(),
            summary: entity_summary(entity, self.config.list_cap),
        })
    }

    fn select_adapter(&self, credential: Option<&str>) -> Option<Selected<'_>> {
        let credential = credential.map(str::trim).filter(|c| !c.is_empty());
        if let Some(credential) = credential {
            match &self.factory {
                Some(factory) => return Some(Selected::Owned(factory.for_credential(credential))),
                None => debug!("Caller credential ignored: no adapter factory configured"),
            }
        }
        self.default_adapter
            .as_deref()
            .filter(|a| a.available())
            .map(Selected::Borrowed)
    }
}

fn failure_kind(failure: &ProviderFailure) -> ErrorKind {
    match failure.kind {
        ErrorKind::Other => ErrorKind::classify(&failure.message),
        kind => kind,
    }
}

fn hint(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::RateLimited | ErrorKind::Quota => QUOTA_HINT,
        ErrorKind::Authentication => AUTH_HINT,
        _ => "",
    }
}
