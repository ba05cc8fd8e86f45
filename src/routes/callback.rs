use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::Value;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::generate::{CallbackAck, CallbackPayload};
use crate::models::job::{CompletionStatus, JobResult};

pub const CALLBACK_SECRET_HEADER: &str = "x-callback-secret";

const UNKNOWN_ERROR: &str = "Unknown error";

/// POST /api/generate/callback — Called by the workflow to announce a job id
/// (`{jobId}`) and later to deliver its result (`{jobId, status, ...}`).
pub async fn job_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CallbackPayload>, JsonRejection>,
) -> Result<Json<CallbackAck>, ApiError> {
    let expected = state
        .config
        .callback_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::Misconfigured("Callback secret is not configured"))?;

    let provided = headers
        .get(CALLBACK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if provided != Some(expected) {
        metrics::counter!("job_callbacks_unauthorized_total").increment(1);
        tracing::warn!(
            header_present = provided.is_some(),
            "Rejected unauthorized job callback"
        );
        return Err(ApiError::Unauthorized);
    }

    let Json(payload) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let job_id = match payload.job_id {
        Some(Value::String(id)) if !id.trim().is_empty() => id,
        _ => {
            return Err(ApiError::BadRequest(
                "jobId is required and must be a string".to_string(),
            ))
        }
    };

    let Some(raw_status) = payload.status else {
        metrics::counter!("job_callbacks_total", "kind" => "registration").increment(1);
        state.jobs.register_job(&job_id);
        return Ok(Json(CallbackAck {
            ok: true,
            message: format!("Job {job_id} registered"),
        }));
    };

    let Some(raw_status) = raw_status else {
        return Err(ApiError::BadRequest(
            "status must be \"done\" or \"error\" when present".to_string(),
        ));
    };

    let status: CompletionStatus = raw_status.parse().map_err(|_| {
        ApiError::BadRequest(format!(
            "Invalid status \"{raw_status}\", expected \"done\" or \"error\""
        ))
    })?;

    let result = match status {
        CompletionStatus::Done => {
            let video_url = payload
                .video_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(|url| resolve_video_url(state.config.video_base_url.as_deref(), url));
            if video_url.is_none() {
                tracing::warn!(job_id = %job_id, "Job finished without a video URL");
            }
            JobResult::Done { video_url }
        }
        CompletionStatus::Error => JobResult::Error {
            error: payload
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        },
    };

    metrics::counter!("job_callbacks_total", "kind" => "completion").increment(1);
    metrics::counter!("job_results_total", "status" => status.to_string()).increment(1);

    state.jobs.notify_job_complete(&job_id, result);

    Ok(Json(CallbackAck {
        ok: true,
        message: format!("Job {job_id} marked as {status}"),
    }))
}

/// Qualify a relative result link against the workflow engine's base URL.
fn resolve_video_url(base: Option<&str>, raw: &str) -> String {
    if reqwest::Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    base.and_then(|b| reqwest::Url::parse(b).ok())
        .and_then(|b| b.join(raw).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| raw.to_string())
}
