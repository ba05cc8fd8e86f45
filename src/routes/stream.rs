use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use futures::stream::{self, BoxStream, StreamExt};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::job::JobResult;
use crate::routes::JobQuery;
use crate::services::registry::Subscription;

type EventStream = BoxStream<'static, Result<Event, axum::Error>>;

/// GET /api/generate/stream?jobId= — Server-sent result stream.
///
/// Emits exactly one `data:` event carrying the job result, then closes.
/// Until then `: keepalive` comments are sent periodically. A client that
/// disconnects drops the stream, which releases its listener.
pub async fn stream_job(
    State(state): State<AppState>,
    query: Result<Query<JobQuery>, QueryRejection>,
) -> Result<Sse<KeepAliveStream<EventStream>>, ApiError> {
    let job_id = JobQuery::require(query)?;

    let events: EventStream = match state.jobs.subscribe(&job_id) {
        Subscription::Ready(result) => {
            tracing::debug!(job_id = %job_id, "Job already finished, sending result");
            stream::once(async move { result_event(&result) }).boxed()
        }
        Subscription::Pending(pending) => {
            let open = OpenStream::new(job_id);
            stream::once(async move {
                let _open = open;
                pending.wait().await
            })
            .filter_map(|result| async move { result.map(|r| result_event(&r)) })
            .boxed()
        }
    };

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.config.stream_keepalive())
            .text("keepalive"),
    ))
}

fn result_event(result: &JobResult) -> Result<Event, axum::Error> {
    Event::default().json_data(result)
}

/// Tracks a stream that is waiting on a listener.
struct OpenStream {
    job_id: String,
}

impl OpenStream {
    fn new(job_id: String) -> Self {
        metrics::gauge!("job_streams_open").increment(1.0);
        tracing::debug!(job_id = %job_id, "Result stream opened");
        Self { job_id }
    }
}

impl Drop for OpenStream {
    fn drop(&mut self) {
        metrics::gauge!("job_streams_open").decrement(1.0);
        tracing::debug!(job_id = %self.job_id, "Result stream closed");
    }
}
