pub mod replicate;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    /// The remote call cannot be made at all (missing credential).
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
    /// The remote call failed or returned malformed output.
    #[error("embedding provider error: {0}")]
    Provider(String),
}

/// Abstract image-embedding provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single image reference (base64 payload or URL).
    ///
    /// An empty vector means "no embedding produced" and is not an error;
    /// callers exclude such results from scoring and indexing.
    async fn embed(&self, image: &str) -> Result<Vec<f32>, EmbedError>;

    /// Expected embedding dimensionality for this deployment.
    fn dimensions(&self) -> u32;
}
