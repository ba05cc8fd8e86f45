use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{registry::JobRegistry, webhook::WebhookClient};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jobs: Arc<JobRegistry>,
    /// `None` when no generation webhook is configured.
    pub webhook: Option<Arc<WebhookClient>>,
}

impl AppState {
    pub fn new(config: AppConfig, jobs: JobRegistry, webhook: Option<WebhookClient>) -> Self {
        Self {
            config: Arc::new(config),
            jobs: Arc::new(jobs),
            webhook: webhook.map(Arc::new),
        }
    }

    /// Build state from configuration with an empty registry.
    pub fn from_config(config: AppConfig) -> Result<Self, crate::services::webhook::WebhookError> {
        let webhook = match config.generation_webhook_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {
                Some(WebhookClient::new(url.trim(), config.webhook_timeout())?)
            }
            _ => None,
        };
        Ok(Self::new(config, JobRegistry::new(), webhook))
    }
}
