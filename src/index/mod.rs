pub mod pinecone;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::image::IndexEntry;

#[derive(Debug, Error)]
pub enum IndexError {
    /// Missing index host or credential; raised before any network call.
    #[error("index configuration error: {0}")]
    Config(String),
    #[error("index request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("index error ({status}): {body}")]
    Remote { status: u16, body: String },
}

/// Secondary approximate-nearest-neighbor index: a rebuildable, read-optimized
/// projection of the primary store.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert one batch of entries, keyed by id (re-submitting an id
    /// overwrites, never duplicates). Returns the count upserted.
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize, IndexError>;
}
