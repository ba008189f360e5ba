//! Registry of running build monitors.
//!
//! Requests only ever see "accepted"; the registry is what keeps a handle on
//! every monitor so they can be counted, bounded and aborted at shutdown.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinSet};
use tracing::Instrument;
use uuid::Uuid;

use crate::monitor::{BuildMonitor, MonitorOutcome};

/// Handle to one spawned monitor.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    pub id: Uuid,
    pub build_id: String,
    abort: AbortHandle,
}

impl MonitorHandle {
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Tracks monitor tasks. With a limit, at most that many monitors poll at the
/// same time; the rest wait for a slot before their first query.
pub struct MonitorRegistry {
    tasks: Mutex<JoinSet<()>>,
    limit: Option<Arc<Semaphore>>,
}

impl MonitorRegistry {
    pub fn new(max_active: Option<usize>) -> Self {
        Self {
            tasks: Mutex::new(JoinSet::new()),
            limit: max_active.map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Start `monitor` as a background task.
    pub fn spawn(&self, monitor: BuildMonitor) -> MonitorHandle {
        let id = Uuid::new_v4();
        let build_id = monitor.build_id().to_string();
        let limit = self.limit.clone();
        let span = tracing::info_span!("monitor", monitor_id = %id, build_id = %build_id);

        let task = async move {
            let _permit = match limit {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };

            let started_at = Utc::now();
            let outcome = monitor.run().await;
            let elapsed_secs = (Utc::now() - started_at).num_seconds();
            log_outcome(&outcome, elapsed_secs);
        }
        .instrument(span);

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        let abort = tasks.spawn(task);

        tracing::info!(monitor_id = %id, build_id = %build_id, active = tasks.len(), "Monitor started");

        MonitorHandle {
            id,
            build_id,
            abort,
        }
    }

    /// Number of monitors that have not finished yet.
    pub fn active(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    /// Abort every monitor and wait for them to stop.
    pub async fn shutdown(&self) {
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };

        if !tasks.is_empty() {
            tracing::info!(count = tasks.len(), "Aborting running monitors");
        }
        tasks.shutdown().await;
    }
}

impl Default for MonitorRegistry {
    fn default() -> Self {
        Self::unbounded()
    }
}

fn log_outcome(outcome: &MonitorOutcome, elapsed_secs: i64) {
    match outcome {
        MonitorOutcome::Notified { state, polls } => {
            tracing::info!(status = %state, polls, elapsed_secs, "Build notification sent");
        }
        MonitorOutcome::DispatchFailed {
            state,
            polls,
            error,
        } => {
            tracing::error!(
                status = %state,
                polls,
                elapsed_secs,
                error = %error,
                "Build finished but notification was not delivered"
            );
        }
        MonitorOutcome::Abandoned {
            error,
            polls,
            notified,
        } => {
            tracing::warn!(
                polls,
                elapsed_secs,
                notified,
                error = %error,
                "Stopped monitoring build"
            );
        }
    }
}
