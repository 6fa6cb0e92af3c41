pub mod postgres;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::models::image::ImageRecord;

/// Primary store of image records; the system of record for embeddings.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Fetch up to `limit` records carrying a non-empty embedding, in
    /// insertion order.
    async fn find_comparable(&self, limit: i64) -> anyhow::Result<Vec<ImageRecord>>;

    /// Which of the given source URLs already have a record.
    async fn existing_source_urls(&self, urls: &[String]) -> anyhow::Result<HashSet<String>>;

    /// Insert a new record. One row per distinct source URL; a duplicate
    /// URL is an error, never an overwrite.
    async fn insert(&self, record: &ImageRecord) -> anyhow::Result<()>;

    /// Initialize tables.
    async fn initialize(&self) -> anyhow::Result<()>;
}
