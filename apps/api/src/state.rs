use std::sync::Arc;

use crate::ai_client::AiService;
use crate::archive::S3Archive;
use crate::config::Config;
use crate::vector_db::VectorStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Embedding and completion provider, chosen at startup from `USE_OPENAI`.
    pub ai: Arc<dyn AiService>,
    pub vectors: Arc<dyn VectorStore>,
    /// `None` when `ENABLE_S3_ARCHIVE=false`.
    pub archive: Option<S3Archive>,
}
