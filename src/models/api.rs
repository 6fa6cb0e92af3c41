use serde::{Deserialize, Serialize};

use crate::models::image::CandidateImage;

// ──────────────────────────── Compare ────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    /// Query image: base64 payload (optionally a data: URI) or a URL.
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub id: String,
    pub image_url: String,
    pub link: String,
    /// Cosine similarity in [-1, 1].
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub matches: Vec<MatchResult>,
}

// ──────────────────────────── Ingest ────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub candidates: Vec<CandidateImage>,
}

/// Per-item failure captured during ingestion; never aborts the run.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub image_url: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct IngestSummary {
    /// Candidates excluded by URL dedup.
    pub skipped: usize,
    /// New image records persisted.
    pub imported: usize,
    /// Vectors committed to the secondary index.
    pub upserted: usize,
    pub failures: Vec<ItemFailure>,
    /// Index batches that failed; remaining batches still run.
    pub index_errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogImportParams {
    #[serde(default = "default_first")]
    pub first: u32,
}

fn default_first() -> u32 {
    20
}

// ──────────────────────────── Images ────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UploadImageRequest {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadImageResponse {
    pub ok: bool,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    #[serde(default)]
    pub image: Option<String>,
}

/// Diagnostic passthrough: reports only the produced vector length.
#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub embedding_length: usize,
}

// ──────────────────────────── Session ────────────────────────────

/// Verified shop session attached to protected requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub shop: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub ok: bool,
    pub shop: String,
}

// ──────────────────────────── Health ────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
}
