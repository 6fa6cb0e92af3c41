use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info};

use crate::app::AppState;
use crate::models::api::{EmbedRequest, EmbedResponse, UploadImageRequest, UploadImageResponse};
use crate::models::image::ImageRecord;
use crate::routes::require_session;

/// Single-image routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/images", post(upload_image))
        .route("/api/images/embed", post(embed_image))
}

/// POST /api/images - Embed and persist one image.
async fn upload_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UploadImageRequest>,
) -> Result<Json<UploadImageResponse>, (StatusCode, String)> {
    let session = require_session(&state, &headers)?;

    let image = req
        .image
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "image field is required".to_string()))?;

    let embedding = state.embedder.embed(image).await.map_err(|e| {
        error!("Embedding error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Embedding error: {e}"))
    })?;

    let id = uuid::Uuid::new_v4().to_string();
    // Base64 payloads have no URL; give them a synthetic dedup key.
    let source_url = if image.starts_with("http://") || image.starts_with("https://") {
        image.to_string()
    } else {
        format!("upload://{id}")
    };

    let record = ImageRecord {
        id,
        shop: session.shop,
        product_id: String::new(),
        label: req.label.unwrap_or_default(),
        handle: String::new(),
        source_url,
        embedding,
        created_at: None,
    };

    state.store.insert(&record).await.map_err(|e| {
        error!("Store error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}"))
    })?;

    info!("Stored uploaded image {}", record.id);
    Ok(Json(UploadImageResponse {
        ok: true,
        id: record.id,
    }))
}

/// POST /api/images/embed - Diagnostic: embed without persisting.
async fn embed_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, (StatusCode, String)> {
    require_session(&state, &headers)?;

    let image = req
        .image
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "image field is required".to_string()))?;

    let embedding = state.embedder.embed(image).await.map_err(|e| {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Embedding error: {e}"))
    })?;

    Ok(Json(EmbedResponse {
        embedding_length: embedding.len(),
    }))
}
