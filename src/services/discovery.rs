//! Job id discovery.
//!
//! The workflow mints job ids itself and announces them through the
//! registration callback shortly after the webhook is triggered. The
//! generate handler learns "its" id by diffing the registry's id set
//! against a snapshot taken before the trigger.
//!
//! This assumes exactly one new job appears in the window. Overlapping
//! generate requests can cross-assign ids.

use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::services::registry::JobRegistry;

/// Poll `registry` every `poll_interval` until an id missing from
/// `snapshot` appears or `budget` elapses.
pub async fn discover_new_job_id(
    registry: &JobRegistry,
    snapshot: &HashSet<String>,
    poll_interval: Duration,
    budget: Duration,
) -> Option<String> {
    let deadline = Instant::now() + budget;
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if let Some(job_id) = pick_new_id(registry, snapshot) {
            return Some(job_id);
        }

        if Instant::now() >= deadline {
            return None;
        }
    }
}

fn pick_new_id(registry: &JobRegistry, snapshot: &HashSet<String>) -> Option<String> {
    let mut candidates = registry.announced_since(snapshot);

    if candidates.len() > 1 {
        tracing::warn!(
            candidates = ?candidates.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            "Multiple new job ids appeared during discovery, picking the earliest"
        );
    }

    candidates.sort_by(|(a, at_a), (b, at_b)| at_a.cmp(at_b).then_with(|| a.cmp(b)));
    candidates.into_iter().next().map(|(id, _)| id)
}
