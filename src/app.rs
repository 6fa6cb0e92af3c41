use std::sync::Arc;

use crate::catalog::ShopifyCatalog;
use crate::config::Settings;
use crate::embedding::EmbeddingProvider;
use crate::ingest::IngestPipeline;
use crate::store::ImageStore;

/// Shared application state passed to all route handlers.
pub struct AppState {
    pub settings: Settings,
    pub store: Arc<dyn ImageStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub pipeline: IngestPipeline,
    pub catalog: ShopifyCatalog,
}
