//! Test helpers: mock transport, manual progress source, and orchestrator
//! harness. Run with `cargo test -p scriptorium-client`.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex, Notify};
use uuid::Uuid;

use scriptorium_client::orchestrator::{ProgressCallback, UploadOrchestrator};
use scriptorium_client::progress::{
    polling::PollingProgressSource, ProgressSource, ProgressSubscription, SourceEvent,
};
use scriptorium_client::request::BulkUploadRequest;
use scriptorium_client::transport::{
    AggregateProgress, BulkUploadResponse, FileStatusUpdate, ProgressData, UploadTransport,
};
use scriptorium_core::config::LimitsConfig;
use scriptorium_core::{
    BatchSnapshot, FileCandidate, FileValidator, MediaKind, MediaRecord, NoInferenceResolver,
    SessionContext, StaticSessionProvider, TargetSelection, UploadConfig, UploadError, UploadFile,
    UploadStatus,
};

/// Transport with scripted responses and call counters.
pub struct MockTransport {
    /// Records returned by a successful submit.
    pub records: Vec<MediaRecord>,
    /// When true, submit fails with a non-retryable 400.
    pub submit_fails: bool,
    /// When set, submit blocks until the notify is signalled.
    pub hang_submit: Option<Arc<Notify>>,
    /// Rows returned by fetch_resumable.
    pub resumable: Vec<FileStatusUpdate>,
    pub submit_calls: AtomicUsize,
    pub progress_calls: AtomicUsize,
    pub resumable_calls: AtomicUsize,
    progress_script: Mutex<VecDeque<Vec<FileStatusUpdate>>>,
    last_progress: Mutex<Vec<FileStatusUpdate>>,
}

impl MockTransport {
    pub fn new(records: Vec<MediaRecord>) -> Self {
        Self {
            records,
            submit_fails: false,
            hang_submit: None,
            resumable: Vec::new(),
            submit_calls: AtomicUsize::new(0),
            progress_calls: AtomicUsize::new(0),
            resumable_calls: AtomicUsize::new(0),
            progress_script: Mutex::new(VecDeque::new()),
            last_progress: Mutex::new(Vec::new()),
        }
    }

    /// Queue per-tick progress responses. Once the script is exhausted the
    /// last response repeats.
    pub async fn script_progress(&self, ticks: Vec<Vec<FileStatusUpdate>>) {
        *self.progress_script.lock().await = ticks.into();
    }
}

#[async_trait]
impl UploadTransport for MockTransport {
    async fn submit(
        &self,
        files: &[BulkUploadRequest],
        _token: &str,
    ) -> Result<BulkUploadResponse, UploadError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.hang_submit {
            gate.notified().await;
        }
        if self.submit_fails {
            return Err(UploadError::Http {
                status: 400,
                message: "invalid metadata".to_string(),
            });
        }
        Ok(BulkUploadResponse {
            total_files: files.len(),
            batch_id: "batch-1".to_string(),
            media_records: self.records.clone(),
        })
    }

    async fn fetch_progress(
        &self,
        _ids: &[Uuid],
        _token: &str,
    ) -> Result<ProgressData, UploadError> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        let files = {
            let mut script = self.progress_script.lock().await;
            match script.pop_front() {
                Some(tick) => {
                    *self.last_progress.lock().await = tick.clone();
                    tick
                }
                None => self.last_progress.lock().await.clone(),
            }
        };
        Ok(ProgressData {
            files,
            progress: AggregateProgress {
                percentage: 0.0,
                status: UploadStatus::Uploading,
            },
        })
    }

    async fn fetch_resumable(
        &self,
        _since: DateTime<Utc>,
        _token: &str,
    ) -> Result<Vec<FileStatusUpdate>, UploadError> {
        self.resumable_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.resumable.clone())
    }
}

/// Progress source whose subscription is hand-fed by the test. Returns the
/// event sender and the receiver that observes the tracker's stop signal.
pub struct ManualSource {
    subscription: Mutex<Option<ProgressSubscription>>,
}

#[async_trait]
impl ProgressSource for ManualSource {
    async fn subscribe(&self, _ids: Vec<Uuid>) -> Result<ProgressSubscription, UploadError> {
        self.subscription
            .lock()
            .await
            .take()
            .ok_or_else(|| UploadError::Tracking("subscription already taken".to_string()))
    }
}

pub fn manual_source() -> (ManualSource, mpsc::Sender<SourceEvent>, mpsc::Receiver<()>) {
    let (event_tx, event_rx) = mpsc::channel(32);
    let (stop_tx, stop_rx) = mpsc::channel(1);
    let source = ManualSource {
        subscription: Mutex::new(Some(ProgressSubscription::from_parts(event_rx, stop_tx))),
    };
    (source, event_tx, stop_rx)
}

pub fn pending_record(id: Uuid, name: &str) -> MediaRecord {
    MediaRecord {
        media_file_id: id,
        file_name: name.to_string(),
        status: UploadStatus::Pending,
        error: None,
    }
}

pub fn wire_update(id: Uuid, name: &str, status: UploadStatus) -> FileStatusUpdate {
    wire_update_aged(id, name, status, ChronoDuration::zero())
}

pub fn wire_update_aged(
    id: Uuid,
    name: &str,
    status: UploadStatus,
    age: ChronoDuration,
) -> FileStatusUpdate {
    let now = Utc::now();
    FileStatusUpdate {
        media_file_id: id,
        file_name: name.to_string(),
        status,
        download_url: None,
        error: None,
        created_at: now - age,
        updated_at: now,
    }
}

/// An eligible staged audio file.
pub fn eligible_file(name: &str) -> UploadFile {
    let validator = FileValidator::new(LimitsConfig::default());
    let mut file = UploadFile::stage(
        FileCandidate {
            file_name: name.to_string(),
            content_type: "audio/mpeg".to_string(),
            kind: MediaKind::Audio,
            payload: Bytes::from_static(b"audio-bytes"),
            duration_seconds: Some(30.0),
        },
        &validator,
        &NoInferenceResolver,
    );
    file.target = TargetSelection {
        book_id: Some("book-gen".to_string()),
        chapter_id: Some("ch-1".to_string()),
        start_verse_id: Some("v-1".to_string()),
        end_verse_id: Some("v-5".to_string()),
    };
    file
}

pub fn session() -> SessionContext {
    SessionContext::new("lang-1", "ver-1")
}

/// Orchestrator wired to a mock transport and a polling source, collecting
/// every callback snapshot.
pub struct TestHarness {
    pub orchestrator: Arc<UploadOrchestrator>,
    pub transport: Arc<MockTransport>,
    pub snapshots: Arc<StdMutex<Vec<BatchSnapshot>>>,
}

pub fn polling_harness(transport: Arc<MockTransport>, config: UploadConfig) -> TestHarness {
    let snapshots: Arc<StdMutex<Vec<BatchSnapshot>>> = Arc::new(StdMutex::new(Vec::new()));
    let sink = snapshots.clone();
    let callback: ProgressCallback = Arc::new(move |snapshot| {
        sink.lock().expect("snapshot sink poisoned").push(snapshot);
    });

    let session_provider = Arc::new(StaticSessionProvider::new("test-token"));
    let source = Arc::new(PollingProgressSource::new(
        transport.clone(),
        session_provider.clone(),
        config.tracking.poll_interval,
    ));

    let orchestrator = Arc::new(UploadOrchestrator::new(
        transport.clone(),
        source,
        session_provider,
        callback,
        config,
    ));

    TestHarness {
        orchestrator,
        transport,
        snapshots,
    }
}

/// Await until no batch is active (auto-advancing paused time).
pub async fn wait_idle(orchestrator: &UploadOrchestrator) {
    while orchestrator.is_uploading().await {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}
