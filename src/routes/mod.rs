pub mod compare;
pub mod images;
pub mod ingest;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::app::AppState;
use crate::auth::extract_session_from_header;
use crate::models::api::{HealthResponse, PingResponse, SessionContext};

/// Build all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/ping", get(ping))
        .merge(compare::routes())
        .merge(images::routes())
        .merge(ingest::routes())
        .with_state(state)
}

/// Verify the App Bridge session token on a protected route.
pub fn require_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<SessionContext, (StatusCode, String)> {
    extract_session_from_header(
        headers.get("authorization").and_then(|v| v.to_str().ok()),
        &state.settings.shopify_api_secret,
        &state.settings.shopify_api_key,
        state.settings.bypass_auth_mode,
        &state.settings.dev_shop,
    )
}

/// GET /health - Public liveness probe.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        environment: state.settings.environment.clone(),
    })
}

/// GET /api/ping - Session sanity check.
async fn ping(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PingResponse>, (StatusCode, String)> {
    let session = require_session(&state, &headers)?;
    Ok(Json(PingResponse {
        ok: true,
        shop: session.shop,
    }))
}
