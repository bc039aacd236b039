//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to the pool.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::json;

use crate::api::response::api_success;
use crate::api::AppState;
use crate::error::DoorbellResult;
use crate::protocol_constants::SERVICE_ID;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/devices", get(list_devices))
        .route("/api/discover", post(handle_discover))
        .route("/api/status", get(get_status))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "localIp": state.network.get_local_ip(),
    }))
}

async fn list_devices(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({ "devices": state.pool.list_devices() }))
}

/// Rediscovers speakers. Waits for a running chime cycle before swapping.
async fn handle_discover(State(state): State<AppState>) -> DoorbellResult<impl IntoResponse> {
    let count = state.pool.discover().await?;
    Ok(api_success(json!({
        "devices": count,
        "pool": state.pool.list_devices(),
    })))
}

async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let enabled = state.settings.read().enabled;
    api_success(json!({
        "phase": state.pool.phase(),
        "devices": state.pool.len(),
        "enabled": enabled,
        "lastCycle": state.pool.last_cycle(),
    }))
}
