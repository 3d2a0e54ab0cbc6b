//! Upload orchestrator: single entry point and batch-lifecycle owner.
//!
//! A long-lived instance owned by the application context and injected
//! wherever uploads are triggered or observed. Guarantees at most one
//! active batch at a time, seeds an immediate all-pending progress view
//! before the network call resolves, and releases all per-batch resources
//! on convergence (after a grace delay), cancellation, timeout, or error
//! abort. A failed submission never leaves the active-batch guard set.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use scriptorium_core::{
    BatchSnapshot, BatchSummary, ProgressMap, SessionContext, SessionProvider, UploadConfig,
    UploadError, UploadFile,
};

use crate::progress::ProgressSource;
use crate::request::UploadRequestBuilder;
use crate::tracker::{ProgressTracker, TrackingOutcome};
use crate::transport::{BulkUploadResponse, UploadTransport};

/// Invoked with a read-only snapshot on every observable change.
pub type ProgressCallback = Arc<dyn Fn(BatchSnapshot) + Send + Sync>;

/// Placeholder row the UI may show before server-confirmed records exist.
/// Kept separate from the authoritative progress map, which only ever
/// reflects server-confirmed state.
#[derive(Debug, Clone)]
pub struct OptimisticEntry {
    pub id: Uuid,
    pub file_name: String,
}

struct ActiveBatch {
    generation: u64,
    state: Arc<Mutex<ProgressMap>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

#[derive(Default)]
struct Inner {
    generation: u64,
    active: Option<ActiveBatch>,
    /// Final snapshot of the most recently finished batch, kept for
    /// inspection after timeout/error abort/convergence.
    last_snapshot: Option<BatchSnapshot>,
    optimistic: Vec<OptimisticEntry>,
}

pub struct UploadOrchestrator {
    transport: Arc<dyn UploadTransport>,
    source: Arc<dyn ProgressSource>,
    session: Arc<dyn SessionProvider>,
    on_progress: ProgressCallback,
    config: UploadConfig,
    inner: Arc<Mutex<Inner>>,
}

impl UploadOrchestrator {
    pub fn new(
        transport: Arc<dyn UploadTransport>,
        source: Arc<dyn ProgressSource>,
        session: Arc<dyn SessionProvider>,
        on_progress: ProgressCallback,
        config: UploadConfig,
    ) -> Self {
        Self {
            transport,
            source,
            session,
            on_progress,
            config,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Submit a batch and start tracking it.
    ///
    /// Rejects with [`UploadError::UploadInProgress`] while a batch is
    /// active, without touching the active batch's state. Returns the raw
    /// submission response; per-file progress is delivered through the
    /// progress callback.
    pub async fn start_bulk_upload(
        &self,
        files: &[UploadFile],
        session_ctx: &SessionContext,
    ) -> Result<BulkUploadResponse, UploadError> {
        // Guard check and set happen under one lock with no suspension in
        // between; request building is synchronous.
        let (generation, state, seed_snapshot, requests) = {
            let mut inner = self.inner.lock().await;
            if inner.active.is_some() {
                return Err(UploadError::UploadInProgress);
            }

            let outcome = UploadRequestBuilder::build(files, session_ctx)?;
            if outcome.requests.is_empty() {
                return Err(UploadError::Validation(
                    "no files are eligible for upload".to_string(),
                ));
            }

            inner.generation += 1;
            let generation = inner.generation;
            let map = ProgressMap::provisional(
                outcome
                    .requests
                    .iter()
                    .map(|r| (r.client_id, r.file_name.clone())),
            );
            let seed_snapshot = map.snapshot();
            let state = Arc::new(Mutex::new(map));
            inner.active = Some(ActiveBatch {
                generation,
                state: state.clone(),
                shutdown_tx: None,
            });
            (generation, state, seed_snapshot, outcome.requests)
        };

        // Immediate feedback before the network call resolves.
        (self.on_progress)(seed_snapshot);

        let token = match self.session.access_token().await {
            Ok(token) => token,
            Err(e) => {
                self.release_batch(generation).await;
                return Err(UploadError::Unauthorized(format!("no session: {}", e)));
            }
        };

        let response = match self.transport.submit(&requests, &token).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Bulk upload submission failed");
                self.release_batch(generation).await;
                return Err(e);
            }
        };

        tracing::info!(
            batch_id = %response.batch_id,
            total_files = response.total_files,
            "Bulk upload submitted"
        );

        // Reseed with the authoritative server records and arm the tracker.
        let (tracked_ids, reseed_snapshot, shutdown_rx) = {
            let mut inner = self.inner.lock().await;
            let Some(active) = inner
                .active
                .as_mut()
                .filter(|a| a.generation == generation)
            else {
                // Cancelled while the submission was in flight; discard.
                tracing::debug!("Batch cancelled during submission, discarding response");
                return Ok(response);
            };

            let map = ProgressMap::seed_from_records(
                &response.media_records,
                Some(response.batch_id.clone()),
            );
            let tracked_ids = map.tracked_ids();
            let snapshot = map.snapshot();
            *active.state.lock().await = map;
            let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
            active.shutdown_tx = Some(shutdown_tx);
            (tracked_ids, snapshot, shutdown_rx)
        };

        (self.on_progress)(reseed_snapshot);
        self.spawn_tracker(generation, tracked_ids, state, shutdown_rx);

        Ok(response)
    }

    /// Stop tracking and release the active batch. Safe to call at any
    /// point, including when nothing is active or mid-reconciliation;
    /// responses arriving after cancellation never reach a new batch.
    pub async fn stop_tracking(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(active) = inner.active.take() {
            if let Some(tx) = &active.shutdown_tx {
                let _ = tx.try_send(());
            }
            let snapshot = active.state.lock().await.snapshot();
            inner.last_snapshot = Some(snapshot);
            tracing::info!("Upload tracking stopped");
        }
    }

    /// Re-attach to uploads that were in flight before a reload: any
    /// non-terminal backend records created within the resume window.
    /// Best-effort; finding nothing resumable is not an error. Returns the
    /// number of records being tracked again.
    pub async fn resume_uploads(&self) -> Result<usize, UploadError> {
        if self.inner.lock().await.active.is_some() {
            return Err(UploadError::UploadInProgress);
        }

        let token = self
            .session
            .access_token()
            .await
            .map_err(|e| UploadError::Unauthorized(format!("no session: {}", e)))?;

        let since = Utc::now()
            - chrono::Duration::from_std(self.config.resume_window)
                .unwrap_or_else(|_| chrono::Duration::hours(2));
        let records = self.transport.fetch_resumable(since, &token).await?;

        // Server-side filtering is not trusted: enforce the window and
        // drop terminal records here as well.
        let open: Vec<_> = records
            .into_iter()
            .filter(|r| !r.status.is_terminal() && r.created_at >= since)
            .collect();
        if open.is_empty() {
            tracing::debug!("No resumable uploads found");
            return Ok(0);
        }

        let (generation, state, snapshot, shutdown_rx) = {
            let mut inner = self.inner.lock().await;
            if inner.active.is_some() {
                return Err(UploadError::UploadInProgress);
            }
            inner.generation += 1;
            let generation = inner.generation;

            let map = ProgressMap::seed_from_updates(open.iter().cloned().map(Into::into));
            let snapshot = map.snapshot();
            let state = Arc::new(Mutex::new(map));
            let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
            inner.active = Some(ActiveBatch {
                generation,
                state: state.clone(),
                shutdown_tx: Some(shutdown_tx),
            });
            (generation, state, snapshot, shutdown_rx)
        };

        let resumed = open.len();
        tracing::info!(resumed, "Re-attached to in-flight uploads");
        let tracked_ids = open.iter().map(|r| r.media_file_id).collect();
        (self.on_progress)(snapshot);
        self.spawn_tracker(generation, tracked_ids, state, shutdown_rx);

        Ok(resumed)
    }

    /// Whether a batch is currently active.
    pub async fn is_uploading(&self) -> bool {
        self.inner.lock().await.active.is_some()
    }

    /// Snapshot of the active batch, or the final snapshot of the most
    /// recently finished one.
    pub async fn snapshot(&self) -> Option<BatchSnapshot> {
        let inner = self.inner.lock().await;
        match &inner.active {
            Some(active) => Some(active.state.lock().await.snapshot()),
            None => inner.last_snapshot.clone(),
        }
    }

    pub async fn summary(&self) -> Option<BatchSummary> {
        self.snapshot().await.map(|s| s.summary)
    }

    /// Register a placeholder row for the UI ahead of server confirmation.
    pub async fn add_optimistic_entry(&self, entry: OptimisticEntry) {
        self.inner.lock().await.optimistic.push(entry);
    }

    pub async fn remove_optimistic_entry(&self, id: Uuid) {
        self.inner.lock().await.optimistic.retain(|e| e.id != id);
    }

    pub async fn optimistic_entries(&self) -> Vec<OptimisticEntry> {
        self.inner.lock().await.optimistic.clone()
    }

    fn spawn_tracker(
        &self,
        generation: u64,
        tracked_ids: Vec<Uuid>,
        state: Arc<Mutex<ProgressMap>>,
        shutdown_rx: mpsc::Receiver<()>,
    ) {
        let tracker = ProgressTracker::new(self.config.tracking.clone());
        let source = self.source.clone();
        let on_progress = self.on_progress.clone();
        let inner = self.inner.clone();
        let grace = self.config.cleanup_grace;

        tokio::spawn(async move {
            let outcome = tracker
                .run(
                    source.as_ref(),
                    tracked_ids,
                    state,
                    on_progress,
                    shutdown_rx,
                )
                .await;

            if outcome == TrackingOutcome::Converged {
                // Let observers render the final state before teardown.
                tokio::time::sleep(grace).await;
            }

            let mut guard = inner.lock().await;
            let still_ours = guard
                .active
                .as_ref()
                .is_some_and(|a| a.generation == generation);
            if still_ours {
                if let Some(active) = guard.active.take() {
                    let snapshot = active.state.lock().await.snapshot();
                    guard.last_snapshot = Some(snapshot);
                }
                tracing::debug!(outcome = ?outcome, "Batch resources released");
            }
        });
    }

    /// Clear the active-batch guard after a failed submission. The
    /// provisional snapshot is not retained: nothing was uploaded.
    async fn release_batch(&self, generation: u64) {
        let mut inner = self.inner.lock().await;
        let ours = inner
            .active
            .as_ref()
            .is_some_and(|a| a.generation == generation);
        if ours {
            inner.active = None;
        }
    }
}
