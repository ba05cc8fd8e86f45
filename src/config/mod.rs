use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Workflow webhook that starts a generation run
    pub generation_webhook_url: Option<String>,

    /// Shared secret expected in the `X-Callback-Secret` header
    pub callback_secret: Option<String>,

    /// Base URL of the workflow engine, used to qualify relative result links
    pub video_base_url: Option<String>,

    /// Site identifier forwarded with every generation request
    #[serde(default = "default_site_name")]
    pub site_name: String,

    #[serde(default = "default_webhook_timeout_ms")]
    pub webhook_timeout_ms: u64,

    #[serde(default = "default_discovery_poll_interval_ms")]
    pub discovery_poll_interval_ms: u64,

    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,

    /// Interval between `: keepalive` frames on open result streams
    #[serde(default = "default_stream_keepalive_secs")]
    pub stream_keepalive_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_site_name() -> String {
    "website".to_string()
}

fn default_webhook_timeout_ms() -> u64 {
    25_000
}

fn default_discovery_poll_interval_ms() -> u64 {
    100
}

fn default_discovery_timeout_ms() -> u64 {
    3_000
}

fn default_stream_keepalive_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_millis(self.webhook_timeout_ms)
    }

    pub fn discovery_poll_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_poll_interval_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn stream_keepalive(&self) -> Duration {
        Duration::from_secs(self.stream_keepalive_secs)
    }
}
