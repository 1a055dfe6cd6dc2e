//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::memory::{ChatSummarizer, InMemoryStore, Storage, Summarizer};

/// State shared by all sessions.
///
/// The store is the only mutable state shared across sessions; it serializes
/// its own writes internally.
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Storage collaborator
    pub store: Arc<dyn Storage>,
    /// Summarizer collaborator
    pub summarizer: Arc<dyn Summarizer>,
}

impl AppState {
    /// Wire up the default collaborators from configuration.
    pub fn new(config: ServerConfig) -> Self {
        let summarizer: Arc<dyn Summarizer> = match &config.summarizer_endpoint {
            Some(endpoint) => Arc::new(ChatSummarizer::with_endpoint(
                config.openai_api_key.clone(),
                config.summarizer_model.clone(),
                endpoint.clone(),
            )),
            None => Arc::new(ChatSummarizer::new(
                config.openai_api_key.clone(),
                config.summarizer_model.clone(),
            )),
        };

        Self {
            config,
            store: Arc::new(InMemoryStore::new()),
            summarizer,
        }
    }
}
