//! Health check endpoints

use super::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub engine: &'static str,
    /// Names with a replacement in flight
    pub replacements_in_flight: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /v1/ping - liveness of the agent itself
#[inline]
pub async fn ping_handler() -> Json<PingResponse> {
    Json(PingResponse { status: "ok" })
}

/// GET /v1/health - agent plus engine reachability, 503 when the engine is down
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let replacements_in_flight = state.guards.len();

    match state.engine.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                engine: "up",
                replacements_in_flight,
                error: None,
            }),
        ),
        Err(e) => {
            warn!("Container engine ping failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    engine: "down",
                    replacements_in_flight,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
