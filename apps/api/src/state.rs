use std::sync::Arc;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Generative-text provider for reasoning and requirement expansion.
    pub llm: Arc<dyn TextGenerator>,
    /// Remote embedder when `EMBEDDING_API_URL` is set, local hashing otherwise.
    pub embedder: Arc<dyn Embedder>,
    pub config: Config,
}
