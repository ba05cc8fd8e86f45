use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Terminal outcome of an external generation job.
///
/// Serialized with a `status` tag so the stored value can be handed to
/// clients verbatim: `{"status":"done","videoUrl":"..."}` or
/// `{"status":"error","error":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobResult {
    Done {
        /// `None` when the workflow finished without a usable video.
        #[serde(rename = "videoUrl", default, skip_serializing_if = "Option::is_none")]
        video_url: Option<String>,
    },
    Error {
        error: String,
    },
}

impl JobResult {
    pub fn done(video_url: impl Into<String>) -> Self {
        JobResult::Done {
            video_url: Some(video_url.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        JobResult::Error {
            error: message.into(),
        }
    }

    pub fn status(&self) -> CompletionStatus {
        match self {
            JobResult::Done { .. } => CompletionStatus::Done,
            JobResult::Error { .. } => CompletionStatus::Error,
        }
    }
}

/// Status values accepted on a completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CompletionStatus {
    Done,
    Error,
}

/// Response for GET /api/generate/status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatusResponse {
    Pending,
    Done {
        #[serde(rename = "videoUrl", skip_serializing_if = "Option::is_none")]
        video_url: Option<String>,
    },
    Error {
        error: String,
    },
}

impl From<Option<JobResult>> for JobStatusResponse {
    fn from(result: Option<JobResult>) -> Self {
        match result {
            None => JobStatusResponse::Pending,
            Some(JobResult::Done { video_url }) => JobStatusResponse::Done { video_url },
            Some(JobResult::Error { error }) => JobStatusResponse::Error { error },
        }
    }
}
