use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::error;

use crate::app::AppState;
use crate::models::api::{CatalogImportParams, IngestRequest, IngestSummary};
use crate::routes::require_session;

/// Batch ingestion routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/ingest", post(ingest_candidates))
        .route("/api/catalog/import", post(import_from_catalog))
        .route("/api/index/rebuild", post(rebuild_index))
}

/// POST /api/ingest - Ingest caller-supplied catalog candidates.
///
/// Always answers 200 with a partial-result envelope; only structural
/// errors (bad session, store outage during dedup) are error statuses.
async fn ingest_candidates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestSummary>, (StatusCode, String)> {
    let session = require_session(&state, &headers)?;

    let summary = state
        .pipeline
        .run(&session.shop, req.candidates)
        .await
        .map_err(|e| {
            error!("Ingest error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Ingest error: {e}"))
        })?;

    Ok(Json(summary))
}

/// POST /api/catalog/import - Pull candidates from the shop catalog and
/// run them through the same pipeline.
async fn import_from_catalog(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CatalogImportParams>,
) -> Result<Json<IngestSummary>, (StatusCode, String)> {
    let session = require_session(&state, &headers)?;

    if !state.catalog.is_configured() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "catalog import requires SHOPIFY_ADMIN_TOKEN".to_string(),
        ));
    }

    let candidates = state
        .catalog
        .fetch_candidates(&session.shop, params.first)
        .await
        .map_err(|e| {
            error!("Catalog error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Catalog error: {e}"))
        })?;

    let summary = state
        .pipeline
        .run(&session.shop, candidates)
        .await
        .map_err(|e| {
            error!("Ingest error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Ingest error: {e}"))
        })?;

    Ok(Json(summary))
}

#[derive(Debug, serde::Serialize)]
struct RebuildResponse {
    upserted: usize,
    index_errors: Vec<String>,
}

/// POST /api/index/rebuild - Re-project the primary store into the index.
async fn rebuild_index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RebuildResponse>, (StatusCode, String)> {
    require_session(&state, &headers)?;

    let (upserted, index_errors) = state
        .pipeline
        .rebuild_index(state.settings.rebuild_scan_limit)
        .await
        .map_err(|e| {
            error!("Rebuild error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Rebuild error: {e}"))
        })?;

    Ok(Json(RebuildResponse {
        upserted,
        index_errors,
    }))
}
