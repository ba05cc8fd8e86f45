use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::services::registry::JobRegistry;

#[derive(Clone)]
pub struct MetricsState {
    pub handle: Arc<PrometheusHandle>,
    pub jobs: Arc<JobRegistry>,
}

/// Prometheus metrics scrape endpoint.
/// Registry sizes are sampled at scrape time.
pub async fn prometheus_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    let stats = state.jobs.stats();
    metrics::gauge!("job_registry_known").set(stats.known as f64);
    metrics::gauge!("job_registry_completed").set(stats.completed as f64);
    metrics::gauge!("job_registry_pending_listeners").set(stats.pending_listeners as f64);
    state.handle.render()
}
