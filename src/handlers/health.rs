use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "Health"
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Service identity and build info
#[utoipa::path(
    get,
    path = "/status",
    responses((status = 200, description = "Service status")),
    tag = "Health"
)]
pub async fn api_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
