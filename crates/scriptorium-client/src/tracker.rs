//! Progress tracker: converges a seeded progress map to a terminal state.
//!
//! Per batch the tracker moves `idle -> tracking -> (converged | timed_out
//! | error_aborted | stopped)`. Updates merge idempotently and terminal
//! statuses never regress; convergence is decided solely from the per-file
//! terminal tally. The subscription is released on every exit path.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use scriptorium_core::config::TrackingConfig;
use scriptorium_core::ProgressMap;

use crate::orchestrator::ProgressCallback;
use crate::progress::{ProgressSource, SourceEvent};

/// Exit state of one tracking run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingOutcome {
    /// Every tracked record reached a terminal status.
    Converged,
    /// The maximum tracking duration elapsed. Outstanding records keep
    /// their last-known non-terminal statuses; nothing is fabricated.
    TimedOut,
    /// Too many consecutive reconciliation failures. Individual files are
    /// not marked failed; their last-known statuses are preserved.
    ErrorAborted,
    /// Explicitly cancelled.
    Stopped,
}

pub struct ProgressTracker {
    config: TrackingConfig,
}

impl ProgressTracker {
    pub fn new(config: TrackingConfig) -> Self {
        Self { config }
    }

    /// Track `ids` until convergence, timeout, error budget exhaustion, or
    /// a shutdown signal. Notifies `on_change` only when at least one
    /// record actually changed.
    pub async fn run(
        &self,
        source: &dyn ProgressSource,
        ids: Vec<Uuid>,
        state: Arc<Mutex<ProgressMap>>,
        on_change: ProgressCallback,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> TrackingOutcome {
        // Seeds can already be fully terminal, e.g. when every file failed
        // at submission.
        if state.lock().await.all_terminal() {
            tracing::info!("Batch terminal at seed time, nothing to track");
            return TrackingOutcome::Converged;
        }

        let mut subscription = match source.subscribe(ids).await {
            Ok(sub) => sub,
            Err(e) => {
                tracing::error!(error = %e, "Failed to subscribe to progress source");
                return TrackingOutcome::ErrorAborted;
            }
        };

        let deadline = tokio::time::sleep(self.config.max_duration);
        tokio::pin!(deadline);
        let mut consecutive_errors = 0u32;

        let outcome = loop {
            tokio::select! {
                _ = &mut deadline => {
                    tracing::warn!(
                        max_duration_secs = self.config.max_duration.as_secs(),
                        "Tracking exceeded maximum duration"
                    );
                    break TrackingOutcome::TimedOut;
                }
                _ = shutdown_rx.recv() => break TrackingOutcome::Stopped,
                maybe_event = subscription.next_event() => match maybe_event {
                    None => {
                        tracing::warn!("Progress source ended unexpectedly");
                        break TrackingOutcome::ErrorAborted;
                    }
                    Some(SourceEvent::SourceError(message)) => {
                        consecutive_errors += 1;
                        tracing::warn!(
                            consecutive_errors,
                            budget = self.config.max_consecutive_errors,
                            error = %message,
                            "Progress reconciliation failed"
                        );
                        if consecutive_errors >= self.config.max_consecutive_errors {
                            break TrackingOutcome::ErrorAborted;
                        }
                    }
                    Some(SourceEvent::Updates(updates)) => {
                        consecutive_errors = 0;
                        let (changed_snapshot, converged) = {
                            let mut map = state.lock().await;
                            let changed = map.apply_all(
                                updates.into_iter().map(Into::into),
                            );
                            (changed.then(|| map.snapshot()), map.all_terminal())
                        };
                        if let Some(snapshot) = changed_snapshot {
                            on_change(snapshot);
                        }
                        if converged {
                            break TrackingOutcome::Converged;
                        }
                    }
                }
            }
        };

        // Mandatory cleanup on every exit path.
        subscription.stop().await;
        tracing::info!(outcome = ?outcome, "Progress tracking finished");
        outcome
    }
}
