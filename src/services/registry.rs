//! In-process job registry.
//!
//! Holds the two shared structures of the relay behind one mutex:
//! the set of job ids the workflow has announced (with their terminal
//! results once known), and at most one pending listener per job id.
//! Listeners are one-shot channels; completion is dispatched on the
//! notifier's call stack.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

use crate::models::job::JobResult;

#[derive(Debug)]
struct JobEntry {
    registered_at: DateTime<Utc>,
    result: Option<JobResult>,
}

#[derive(Debug)]
struct Listener {
    token: u64,
    sender: oneshot::Sender<JobResult>,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<String, JobEntry>,
    listeners: HashMap<String, Listener>,
}

/// Point-in-time counts for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RegistryStats {
    pub known: usize,
    pub completed: usize,
    pub pending_listeners: usize,
}

/// Job store, listener registry, and completion notifier.
#[derive(Debug, Default)]
pub struct JobRegistry {
    inner: Mutex<Inner>,
    next_token: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every critical section leaves the maps consistent, so a poisoned
        // lock is still safe to use.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make a job id known without giving it a result. Idempotent.
    pub fn register_job(&self, job_id: &str) {
        let mut inner = self.lock();
        if inner.jobs.contains_key(job_id) {
            tracing::debug!(job_id, "Job already registered");
            return;
        }
        inner.jobs.insert(
            job_id.to_string(),
            JobEntry {
                registered_at: Utc::now(),
                result: None,
            },
        );
        tracing::info!(job_id, "Job registered");
    }

    /// Store the terminal result for a job and wake its listener, if any.
    ///
    /// A second notification for the same id overwrites the first.
    /// Completion does not require a prior `register_job`.
    pub fn notify_job_complete(&self, job_id: &str, result: JobResult) {
        let (listener, registered_at) = {
            let mut inner = self.lock();
            let entry = inner
                .jobs
                .entry(job_id.to_string())
                .or_insert_with(|| JobEntry {
                    registered_at: Utc::now(),
                    result: None,
                });
            if entry.result.is_some() {
                tracing::warn!(job_id, "Overwriting existing result for job");
            }
            entry.result = Some(result.clone());
            let registered_at = entry.registered_at;
            (inner.listeners.remove(job_id), registered_at)
        };

        let elapsed_ms = (Utc::now() - registered_at).num_milliseconds();
        tracing::info!(
            job_id,
            status = %result.status(),
            elapsed_ms,
            has_listener = listener.is_some(),
            "Job completed"
        );

        if let Some(listener) = listener {
            if listener.sender.send(result).is_err() {
                tracing::debug!(job_id, "Listener went away before delivery");
            }
        }
    }

    /// Terminal result for a job, or `None` while it is unknown or pending.
    pub fn get_job_result(&self, job_id: &str) -> Option<JobResult> {
        self.lock().jobs.get(job_id).and_then(|e| e.result.clone())
    }

    /// Every job id observed so far, including ids only seen via a listener.
    pub fn get_all_job_ids(&self) -> HashSet<String> {
        let inner = self.lock();
        inner
            .jobs
            .keys()
            .chain(inner.listeners.keys())
            .cloned()
            .collect()
    }

    /// Ids announced by the workflow that are missing from `seen`, paired
    /// with when they were first stored, in one pass under the lock.
    ///
    /// Ids that only have a stream listener are never returned; those come
    /// from clients, not from the workflow.
    pub fn announced_since(&self, seen: &HashSet<String>) -> Vec<(String, DateTime<Utc>)> {
        self.lock()
            .jobs
            .iter()
            .filter(|(id, _)| !seen.contains(id.as_str()))
            .map(|(id, entry)| (id.clone(), entry.registered_at))
            .collect()
    }

    /// When a job id was first seen, if it is known to the store.
    pub fn registered_at(&self, job_id: &str) -> Option<DateTime<Utc>> {
        self.lock().jobs.get(job_id).map(|e| e.registered_at)
    }

    /// Hand `sender` the job's result.
    ///
    /// If the result is already known it is sent immediately and `None` is
    /// returned. Otherwise the sender becomes the job's single listener,
    /// replacing (and dropping) any previous one, and its token is returned.
    pub fn register_listener(
        &self,
        job_id: &str,
        sender: oneshot::Sender<JobResult>,
    ) -> Option<u64> {
        match self.try_listen(job_id, sender) {
            Ok(token) => Some(token),
            Err((result, sender)) => {
                let _ = sender.send(result);
                None
            }
        }
    }

    fn try_listen(
        &self,
        job_id: &str,
        sender: oneshot::Sender<JobResult>,
    ) -> Result<u64, (JobResult, oneshot::Sender<JobResult>)> {
        let mut inner = self.lock();
        if let Some(result) = inner.jobs.get(job_id).and_then(|e| e.result.clone()) {
            return Err((result, sender));
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        if inner
            .listeners
            .insert(job_id.to_string(), Listener { token, sender })
            .is_some()
        {
            tracing::debug!(job_id, "Replaced existing listener");
        }
        Ok(token)
    }

    /// Remove a listener, but only if it is still the one identified by `token`.
    pub fn remove_listener(&self, job_id: &str, token: u64) -> bool {
        let mut inner = self.lock();
        match inner.listeners.get(job_id) {
            Some(listener) if listener.token == token => {
                inner.listeners.remove(job_id);
                true
            }
            _ => false,
        }
    }

    /// Subscribe to a job's result.
    ///
    /// The returned [`Subscription::Pending`] owns a guard that removes its
    /// listener again if it is dropped before delivery.
    pub fn subscribe(self: &Arc<Self>, job_id: &str) -> Subscription {
        let (sender, receiver) = oneshot::channel();
        match self.try_listen(job_id, sender) {
            Err((result, _)) => Subscription::Ready(result),
            Ok(token) => Subscription::Pending(PendingResult {
                receiver,
                _guard: ListenerGuard {
                    registry: Arc::clone(self),
                    job_id: job_id.to_string(),
                    token,
                },
            }),
        }
    }

    /// Drop every pending listener so that waiting streams close.
    pub fn close_listeners(&self) -> usize {
        let mut inner = self.lock();
        let count = inner.listeners.len();
        inner.listeners.clear();
        count
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.lock();
        RegistryStats {
            known: inner.jobs.len(),
            completed: inner.jobs.values().filter(|e| e.result.is_some()).count(),
            pending_listeners: inner.listeners.len(),
        }
    }
}

/// Outcome of [`JobRegistry::subscribe`].
#[derive(Debug)]
pub enum Subscription {
    /// The job had already finished.
    Ready(JobResult),
    /// The job is still running; await [`PendingResult::wait`].
    Pending(PendingResult),
}

#[derive(Debug)]
pub struct PendingResult {
    receiver: oneshot::Receiver<JobResult>,
    _guard: ListenerGuard,
}

impl PendingResult {
    /// Wait for the result. `None` if the listener was replaced or the
    /// registry shut down first.
    pub async fn wait(self) -> Option<JobResult> {
        let PendingResult { receiver, _guard } = self;
        receiver.await.ok()
    }
}

#[derive(Debug)]
struct ListenerGuard {
    registry: Arc<JobRegistry>,
    job_id: String,
    token: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if self.registry.remove_listener(&self.job_id, self.token) {
            tracing::debug!(job_id = %self.job_id, "Released abandoned listener");
        }
    }
}
