//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::assistant::ChatModel;
use crate::browsing::HistorySource;
use crate::config::Config;
use crate::entities::SqliteStore;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Tasks, conversations, messages, data sources and contexts.
    pub store: Arc<SqliteStore>,
    /// Hosted LLM; `None` when no API key is configured.
    pub llm: Option<Arc<dyn ChatModel>>,
    /// Where browsing statistics read visits from.
    pub history: Arc<dyn HistorySource>,
}

impl AppState {
    pub fn llm(&self) -> Option<&dyn ChatModel> {
        self.llm.as_deref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bind_address", &self.config.bind_address)
            .field("store", &self.store)
            .field("llm", &self.llm.as_ref().map(|m| m.model_name().to_owned()))
            .finish_non_exhaustive()
    }
}
