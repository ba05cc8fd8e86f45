use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::ApiError;

pub mod callback;
pub mod generate;
pub mod health;
pub mod metrics;
pub mod stream;

/// `?jobId=` query shared by the status and stream endpoints.
#[derive(Debug, Deserialize)]
pub struct JobQuery {
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
}

impl JobQuery {
    fn require(query: Result<Query<JobQuery>, QueryRejection>) -> Result<String, ApiError> {
        let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
        query
            .job_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("jobId is required".to_string()))
    }
}

/// Routes for the generation relay and health check.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/generate", post(generate::start_generation))
        .route("/api/generate/callback", post(callback::job_callback))
        .route("/api/generate/status", get(generate::get_job_status))
        .route("/api/generate/stream", get(stream::stream_job))
        .with_state(state)
}
