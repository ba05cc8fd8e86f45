use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of POST /api/generate.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequest {
    #[serde(default)]
    #[garde(custom(non_blank_prompt))]
    pub prompt: String,

    /// Number or string; forwarded to the workflow untouched.
    #[serde(default)]
    #[garde(custom(truthy_duration))]
    pub duration: Value,
}

fn non_blank_prompt(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("Prompt is required"));
    }
    Ok(())
}

fn truthy_duration(value: &Value, _ctx: &()) -> garde::Result {
    let present = match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    };
    if present {
        Ok(())
    } else {
        Err(garde::Error::new("Duration is required"))
    }
}

/// Response after the workflow accepted a request and its job id was discovered.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub job_id: String,
}

/// Payload POSTed to the generation webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub prompt: &'a str,
    pub duration: &'a Value,
    pub site: &'a str,
}

/// Body of POST /api/generate/callback.
///
/// Without `status` this announces a new job id; with `status` it delivers
/// the job's terminal result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    /// Kept loose so a non-string id is reported as a bad request.
    pub job_id: Option<Value>,
    /// Outer `None` when the field is absent, `Some(None)` for an explicit null.
    #[serde(default, deserialize_with = "present")]
    pub status: Option<Option<String>>,
    pub video_url: Option<String>,
    pub error: Option<String>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackAck {
    pub ok: bool,
    pub message: String,
}
