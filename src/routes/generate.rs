use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::generate::{GenerateRequest, GenerateResponse};
use crate::models::job::JobStatusResponse;
use crate::routes::JobQuery;
use crate::services::discovery::discover_new_job_id;
use crate::services::webhook::WebhookError;

/// POST /api/generate — Trigger the generation workflow and return its job id.
pub async fn start_generation(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if let Err(report) = request.validate() {
        let message = report
            .iter()
            .next()
            .map(|(_, e)| e.to_string())
            .unwrap_or_else(|| "Invalid request".to_string());
        return Err(ApiError::BadRequest(message));
    }

    let webhook = state
        .webhook
        .as_deref()
        .ok_or(ApiError::Misconfigured("Video generation webhook is not configured"))?;

    metrics::counter!("generation_requests_total").increment(1);

    let snapshot = state.jobs.get_all_job_ids();

    tracing::info!(
        webhook = %webhook.url(),
        prompt_len = request.prompt.len(),
        known_jobs = snapshot.len(),
        "Triggering generation webhook"
    );

    if let Err(e) = webhook
        .trigger(&request.prompt, &request.duration, &state.config.site_name)
        .await
    {
        metrics::counter!("generation_webhook_failures_total", "reason" => e.reason())
            .increment(1);
        return Err(webhook_failure(e, state.config.webhook_timeout_ms));
    }

    let discovered = discover_new_job_id(
        &state.jobs,
        &snapshot,
        state.config.discovery_poll_interval(),
        state.config.discovery_timeout(),
    )
    .await;

    match discovered {
        Some(job_id) => {
            metrics::counter!("generation_jobs_discovered_total").increment(1);
            tracing::info!(job_id = %job_id, "Discovered job id for generation request");
            Ok(Json(GenerateResponse { job_id }))
        }
        None => {
            metrics::counter!("generation_discovery_timeouts_total").increment(1);
            tracing::warn!(
                budget_ms = state.config.discovery_timeout_ms,
                "Workflow accepted the request but no job id was registered"
            );
            Err(ApiError::UpstreamTimeout {
                message: "Timed out waiting for job registration",
                details: format!(
                    "The workflow did not register a job id within {}ms",
                    state.config.discovery_timeout_ms
                ),
            })
        }
    }
}

fn webhook_failure(err: WebhookError, timeout_ms: u64) -> ApiError {
    match err {
        WebhookError::Timeout => {
            tracing::warn!(timeout_ms, "Generation webhook timed out");
            ApiError::UpstreamTimeout {
                message: "Video generation webhook timed out",
                details: format!(
                    "No response within {timeout_ms}ms. The webhook must respond immediately \
                     and continue the generation asynchronously."
                ),
            }
        }
        WebhookError::Rejected { status, details } => {
            tracing::error!(status, details = %details, "Generation webhook rejected request");
            ApiError::UpstreamRejected {
                message: "Video generation webhook rejected the request",
                details,
            }
        }
        WebhookError::Http(e) => {
            tracing::error!(error = %e, "Generation webhook request failed");
            ApiError::Internal {
                message: "Failed to reach video generation webhook",
                details: e.to_string(),
            }
        }
    }
}

/// GET /api/generate/status?jobId= — Poll a job's outcome.
pub async fn get_job_status(
    State(state): State<AppState>,
    query: Result<Query<JobQuery>, QueryRejection>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job_id = JobQuery::require(query)?;
    Ok(Json(state.jobs.get_job_result(&job_id).into()))
}
