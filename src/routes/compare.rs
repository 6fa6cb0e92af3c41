use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::error;

use crate::app::AppState;
use crate::matching::top_matches;
use crate::models::api::{CompareRequest, CompareResponse};
use crate::routes::require_session;

/// Image comparison routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/compare", post(compare))
}

/// POST /api/compare - Rank stored images by similarity to a query image.
async fn compare(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, (StatusCode, String)> {
    require_session(&state, &headers)?;

    let image = req
        .image
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "image field is required".to_string()))?;

    // 1. Embed the query image.
    let query_embedding = state.embedder.embed(image).await.map_err(|e| {
        error!("Embedding error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Embedding error: {e}"))
    })?;

    // 2. Fetch the candidate pool from the primary store.
    let records = state
        .store
        .find_comparable(state.settings.candidate_limit)
        .await
        .map_err(|e| {
            error!("Store error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}"))
        })?;

    // 3. Score, rank, truncate. An empty pool is an empty match list.
    let matches = top_matches(&query_embedding, &records, state.settings.top_k);

    Ok(Json(CompareResponse { matches }))
}
