//! Provider pool with strategy-driven selection and failover
//!
//! # Selection
//!
//! - **Failover**: first available provider in pool order
//! - **Round-robin**: next available provider after the cursor; the cursor
//!   advances on every selection
//! - **Cost / performance priority**: first available provider whose name
//!   matches the priority list in order, else the first available provider
//!
//! # Retries
//!
//! A batch gets up to `max_retries + 1` attempts. Under failover a failed
//! provider is taken out of rotation (for the orchestrator's lifetime, or for
//! the current call with [`RemovalScope::Call`]) and the next one is tried.
//! Other strategies stop after the first failed attempt.

use crate::adapter::ProviderAdapter;
use crate::config::{ProviderStrategy, RemovalScope};
use crate::types::ChunkExtractionResult;
use cropwise_domain::{Chunk, ErrorKind, Usage};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Message returned when the pool has no available provider
pub const NO_PROVIDERS: &str =
    "No LLM providers available. Please configure at least one provider.";

/// Status of one pooled provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    /// Backend name
    pub name: String,
    /// Model identifier
    pub model: String,
    /// Current availability
    pub available: bool,
    /// Context window
    pub token_limit: usize,
}

/// Snapshot of the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Selection strategy
    pub strategy: ProviderStrategy,
    /// Providers in the pool
    pub total_providers: usize,
    /// Providers currently available
    pub available_providers: usize,
    /// Per-provider details, pool order
    pub providers: Vec<ProviderStatus>,
}

/// Multi-provider extraction with failover
pub struct Orchestrator {
    providers: Vec<Box<dyn ProviderAdapter>>,
    strategy: ProviderStrategy,
    removal: RemovalScope,
    max_output_tokens: Option<u32>,
    cursor: usize,
}

impl Orchestrator {
    /// Create an orchestrator over `providers`, kept in the given order
    pub fn new(providers: Vec<Box<dyn ProviderAdapter>>, strategy: ProviderStrategy) -> Self {
        Self {
            providers,
            strategy,
            removal: RemovalScope::default(),
            max_output_tokens: None,
            cursor: 0,
        }
    }

    /// Set how long failed providers stay out of rotation
    pub fn with_removal_scope(mut self, removal: RemovalScope) -> Self {
        self.removal = removal;
        self
    }

    /// Replace the selection strategy and restart the round-robin cycle
    pub fn with_strategy(mut self, strategy: ProviderStrategy) -> Self {
        self.strategy = strategy;
        self.cursor = 0;
        self
    }

    /// Cap completion tokens for every extraction call
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// The selection strategy
    pub fn strategy(&self) -> ProviderStrategy {
        self.strategy
    }

    /// Number of pooled providers, available or not
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True when the pool is empty
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Add a provider if it is currently available
    pub fn add_provider(&mut self, provider: Box<dyn ProviderAdapter>) -> bool {
        if provider.available() {
            info!("Added provider: {}", provider.provider_name());
            self.providers.push(provider);
            true
        } else {
            warn!("Provider {} is not available", provider.provider_name());
            false
        }
    }

    /// Keep only providers named `name`; returns whether any remain
    pub fn retain_provider(&mut self, name: &str) -> bool {
        self.providers.retain(|p| p.provider_name() == name);
        self.cursor = 0;
        !self.providers.is_empty()
    }

    /// Providers currently available, pool order
    pub fn available_providers(&self) -> Vec<&dyn ProviderAdapter> {
        self.providers
            .iter()
            .filter(|p| p.available())
            .map(|p| p.as_ref())
            .collect()
    }

    /// First available provider in pool order
    pub fn first_available(&self) -> Option<&dyn ProviderAdapter> {
        self.providers
            .iter()
            .find(|p| p.available())
            .map(|p| p.as_ref())
    }

    /// Pick the next provider according to the strategy
    pub fn select_next(&mut self) -> Option<&dyn ProviderAdapter> {
        let index = self.select_index(&[])?;
        Some(self.providers[index].as_ref())
    }

    fn select_index(&mut self, skipped: &[usize]) -> Option<usize> {
        let available: Vec<usize> = (0..self.providers.len())
            .filter(|i| !skipped.contains(i) && self.providers[*i].available())
            .collect();
        if available.is_empty() {
            return None;
        }

        match self.strategy {
            ProviderStrategy::Failover => Some(available[0]),
            ProviderStrategy::RoundRobin => {
                let index = available[self.cursor % available.len()];
                self.cursor = self.cursor.wrapping_add(1);
                Some(index)
            }
            ProviderStrategy::CostPriority | ProviderStrategy::PerformancePriority => self
                .strategy
                .priority()
                .iter()
                .find_map(|name| {
                    available
                        .iter()
                        .copied()
                        .find(|i| self.providers[*i].provider_name() == *name)
                })
                .or(Some(available[0])),
        }
    }

    /// Extract a batch of chunks, failing over between providers
    pub fn extract_from_chunks(
        &mut self,
        chunks: &[Chunk],
        combine: bool,
        max_retries: usize,
    ) -> ChunkExtractionResult {
        if self.first_available().is_none() {
            warn!("{}", NO_PROVIDERS);
            return ChunkExtractionResult::failure("none", ErrorKind::Configuration, NO_PROVIDERS);
        }

        let mut skipped: Vec<usize> = Vec::new();
        let mut spent = Usage::default();
        let mut last_error: Option<(ErrorKind, String)> = None;
        let mut attempts = 0;

        while attempts <= max_retries {
            let Some(index) = self.select_index(&skipped) else {
                break;
            };
            let provider = &self.providers[index];
            let name = provider.provider_name().to_string();
            info!("Using provider: {} ({})", name, provider.model());

            let result = provider.extract_from_chunks(chunks, combine, self.max_output_tokens);
            if result.success {
                return result;
            }

            spent.add(&result.total_usage);
            let message = result.error.unwrap_or_default();
            warn!("Provider {} failed: {}", name, message);
            last_error = Some((result.error_kind.unwrap_or(ErrorKind::Other), message));

            if self.strategy != ProviderStrategy::Failover {
                break;
            }
            match self.removal {
                RemovalScope::Instance => {
                    info!("Removing provider {} from the pool", name);
                    self.providers.remove(index);
                }
                RemovalScope::Call => skipped.push(index),
            }
            attempts += 1;
        }

        let (kind, message) = last_error.unwrap_or((
            ErrorKind::Configuration,
            "no provider could be selected".to_string(),
        ));
        let mut failure = ChunkExtractionResult::failure(
            "multiple",
            kind,
            format!("All providers failed. Last error: {}", message),
        );
        failure.total_usage = spent;
        failure
    }

    /// Snapshot of the pool
    pub fn status(&self) -> OrchestratorStatus {
        let providers: Vec<ProviderStatus> = self
            .providers
            .iter()
            .map(|p| ProviderStatus {
                name: p.provider_name().to_string(),
                model: p.model().to_string(),
                available: p.available(),
                token_limit: p.token_limit(),
            })
            .collect();
        OrchestratorStatus {
            strategy: self.strategy,
            total_providers: providers.len(),
            available_providers: providers.iter().filter(|p| p.available).count(),
            providers,
        }
    }
}
