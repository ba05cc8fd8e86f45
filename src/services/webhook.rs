use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::models::generate::WebhookPayload;

/// Client for the workflow webhook that kicks off a generation run.
///
/// The webhook is expected to acknowledge immediately and report back
/// through the callback endpoint.
pub struct WebhookClient {
    http: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WebhookError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST `{prompt, duration, site}` to the webhook.
    pub async fn trigger(
        &self,
        prompt: &str,
        duration: &Value,
        site: &str,
    ) -> Result<(), WebhookError> {
        let payload = WebhookPayload {
            prompt,
            duration,
            site,
        };

        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(WebhookError::from_send)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let details = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string()
            } else {
                body
            };
            return Err(WebhookError::Rejected {
                status: status.as_u16(),
                details,
            });
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook did not respond in time")]
    Timeout,

    #[error("Webhook rejected the request with status {status}: {details}")]
    Rejected { status: u16, details: String },

    #[error("HTTP request to webhook failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl WebhookError {
    fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WebhookError::Timeout
        } else {
            WebhookError::Http(err)
        }
    }

    /// Short label used for the failure-reason metric.
    pub fn reason(&self) -> &'static str {
        match self {
            WebhookError::Timeout => "timeout",
            WebhookError::Rejected { .. } => "rejected",
            WebhookError::Http(_) => "network",
        }
    }
}
