use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::services::registry::RegistryStats;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub webhook_configured: bool,
    pub jobs: RegistryStats,
}

/// GET /health — liveness plus in-memory registry counts.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        webhook_configured: state.webhook.is_some(),
        jobs: state.jobs.stats(),
    })
}
