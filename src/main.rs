use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use videogen_relay::app_state::AppState;
use videogen_relay::config::AppConfig;
use videogen_relay::routes::{self, metrics::MetricsState};
use videogen_relay::services::registry::JobRegistry;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing videogen-relay server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!(
        "generation_requests_total",
        "Generation requests forwarded to the workflow webhook"
    );
    metrics::describe_counter!(
        "generation_jobs_discovered_total",
        "Generation requests whose job id was discovered"
    );
    metrics::describe_counter!(
        "generation_discovery_timeouts_total",
        "Generation requests where no job id was registered in time"
    );
    metrics::describe_counter!(
        "generation_webhook_failures_total",
        "Failed webhook calls by reason"
    );
    metrics::describe_counter!("job_callbacks_total", "Accepted workflow callbacks by kind");
    metrics::describe_counter!(
        "job_callbacks_unauthorized_total",
        "Callbacks rejected for a missing or wrong secret"
    );
    metrics::describe_counter!("job_results_total", "Terminal job results by status");
    metrics::describe_gauge!("job_streams_open", "Result streams waiting on a job");

    if config.generation_webhook_url.is_none() {
        tracing::warn!("GENERATION_WEBHOOK_URL is not set, generation requests will fail");
    }
    if config.callback_secret.is_none() {
        tracing::warn!("CALLBACK_SECRET is not set, workflow callbacks will be rejected");
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::from_config(config).expect("Failed to initialize webhook client");
    let jobs: Arc<JobRegistry> = Arc::clone(&state.jobs);

    let metrics_state = MetricsState {
        handle: prometheus_handle,
        jobs: Arc::clone(&jobs),
    };

    let app = routes::api_router(state)
        // Prometheus metrics endpoint (separate state)
        .merge(
            Router::new()
                .route("/metrics", get(routes::metrics::prometheus_metrics))
                .with_state(metrics_state),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024));

    tracing::info!("Starting videogen-relay on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(jobs))
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM, then release pending listeners so open
/// result streams end and the server can drain.
async fn shutdown_signal(jobs: Arc<JobRegistry>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    let released = jobs.close_listeners();
    tracing::info!(released, "Closed pending result streams");
}
