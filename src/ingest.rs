use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::embedding::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::models::api::{IngestSummary, ItemFailure};
use crate::models::image::{CandidateImage, ImageRecord, IndexEntry};
use crate::store::ImageStore;

/// Deduplicating ingestion pipeline: candidate images in, image records and
/// index entries out, per-item failures reported instead of raised.
pub struct IngestPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn ImageStore>,
    index: Arc<dyn VectorIndex>,
    embed_concurrency: usize,
    upsert_batch_size: usize,
}

enum ItemOutcome {
    Imported(ImageRecord),
    Failed(ItemFailure),
}

impl IngestPipeline {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn ImageStore>,
        index: Arc<dyn VectorIndex>,
        embed_concurrency: usize,
        upsert_batch_size: usize,
    ) -> Self {
        Self {
            provider,
            store,
            index,
            embed_concurrency: embed_concurrency.max(1),
            upsert_batch_size: upsert_batch_size.max(1),
        }
    }

    /// Ingest a batch of catalog candidates for one shop.
    ///
    /// A crash mid-run can leave records persisted without index entries;
    /// the index is a rebuildable projection, so nothing is rolled back.
    pub async fn run(
        &self,
        shop: &str,
        candidates: Vec<CandidateImage>,
    ) -> anyhow::Result<IngestSummary> {
        let total = candidates.len();

        // Dedup by source URL against the store, first occurrence wins
        // within the submitted batch.
        let urls: Vec<String> = candidates
            .iter()
            .map(|c| c.image_url.clone())
            .filter(|u| !u.is_empty())
            .collect();
        let mut seen = self.store.existing_source_urls(&urls).await?;

        let mut failures: Vec<ItemFailure> = Vec::new();
        let mut fresh: Vec<CandidateImage> = Vec::new();
        let mut skipped = 0usize;
        for candidate in candidates {
            if candidate.image_url.is_empty() {
                failures.push(ItemFailure {
                    image_url: String::new(),
                    error: "candidate has no image_url".to_string(),
                });
                continue;
            }
            if !seen.insert(candidate.image_url.clone()) {
                skipped += 1;
                continue;
            }
            fresh.push(candidate);
        }
        info!(
            "Ingest for {shop}: {} candidates, {skipped} skipped by dedup, {} to embed",
            total,
            fresh.len()
        );

        // Bounded worker pool: a fixed number of workers drain a shared
        // queue; outcomes land in slots keyed by original position so the
        // summary is stable regardless of completion order.
        let pending = fresh.len();
        let queue: Arc<Mutex<VecDeque<(usize, CandidateImage)>>> =
            Arc::new(Mutex::new(fresh.into_iter().enumerate().collect()));
        let slots: Arc<Mutex<Vec<Option<ItemOutcome>>>> =
            Arc::new(Mutex::new((0..pending).map(|_| None).collect()));

        let workers = self.embed_concurrency.min(pending.max(1));
        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let slots = Arc::clone(&slots);
            let provider = Arc::clone(&self.provider);
            let store = Arc::clone(&self.store);
            let shop = shop.to_string();
            pool.spawn(async move {
                loop {
                    let next = { queue.lock().await.pop_front() };
                    let Some((slot, candidate)) = next else { break };
                    let outcome =
                        embed_and_persist(provider.as_ref(), store.as_ref(), &shop, candidate)
                            .await;
                    slots.lock().await[slot] = Some(outcome);
                }
            });
        }
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                warn!("Ingest worker aborted: {e}");
            }
        }

        let mut imported: Vec<ImageRecord> = Vec::new();
        for outcome in slots.lock().await.drain(..) {
            match outcome {
                Some(ItemOutcome::Imported(record)) => imported.push(record),
                Some(ItemOutcome::Failed(failure)) => failures.push(failure),
                None => {}
            }
        }

        // Project into the secondary index. Records without an embedding
        // stay out of the index but keep their URL claimed for dedup.
        let entries: Vec<IndexEntry> = imported
            .iter()
            .filter(|r| !r.embedding.is_empty())
            .map(|r| r.to_index_entry())
            .collect();
        let (upserted, index_errors) = self.upsert_in_batches(&entries).await;

        info!(
            "Ingest for {shop} done: {} imported, {upserted} upserted, {} failures",
            imported.len(),
            failures.len()
        );

        Ok(IngestSummary {
            skipped,
            imported: imported.len(),
            upserted,
            failures,
            index_errors,
        })
    }

    /// Rebuild the secondary index from the primary store.
    pub async fn rebuild_index(&self, limit: i64) -> anyhow::Result<(usize, Vec<String>)> {
        let records = self.store.find_comparable(limit).await?;
        let entries: Vec<IndexEntry> = records.iter().map(|r| r.to_index_entry()).collect();
        info!("Rebuilding index from {} stored records", entries.len());
        Ok(self.upsert_in_batches(&entries).await)
    }

    /// Upsert entries in sequential batches; each batch is an independent
    /// unit, so a failed batch is recorded and the rest still run.
    async fn upsert_in_batches(&self, entries: &[IndexEntry]) -> (usize, Vec<String>) {
        let mut upserted = 0usize;
        let mut errors = Vec::new();
        for batch in entries.chunks(self.upsert_batch_size) {
            match self.index.upsert(batch).await {
                Ok(count) => {
                    upserted += count;
                    info!("Upsert {upserted}/{}", entries.len());
                }
                Err(e) => {
                    warn!("Index upsert batch failed: {e}");
                    errors.push(e.to_string());
                }
            }
        }
        (upserted, errors)
    }
}

async fn embed_and_persist(
    provider: &dyn EmbeddingProvider,
    store: &dyn ImageStore,
    shop: &str,
    candidate: CandidateImage,
) -> ItemOutcome {
    let embedding = match provider.embed(&candidate.image_url).await {
        Ok(vector) => vector,
        Err(e) => {
            return ItemOutcome::Failed(ItemFailure {
                image_url: candidate.image_url,
                error: e.to_string(),
            })
        }
    };

    let record = ImageRecord {
        id: uuid::Uuid::new_v4().to_string(),
        shop: shop.to_string(),
        product_id: candidate.product_id,
        label: candidate.title,
        handle: candidate.handle,
        source_url: candidate.image_url.clone(),
        embedding,
        created_at: None,
    };

    match store.insert(&record).await {
        Ok(()) => ItemOutcome::Imported(record),
        Err(e) => ItemOutcome::Failed(ItemFailure {
            image_url: candidate.image_url,
            error: format!("store insert failed: {e}"),
        }),
    }
}
