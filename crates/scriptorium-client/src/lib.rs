//! Scriptorium bulk upload client.
//!
//! Turns a set of staged local files into a validated batch submission and
//! converges the per-file progress view to a terminal state:
//!
//! caller -> [`request::UploadRequestBuilder`] -> [`orchestrator::UploadOrchestrator`]
//! -> [`transport::UploadTransport`] (multipart submit with retry/backoff)
//! -> [`tracker::ProgressTracker`] (polling or realtime reconciliation)
//! -> progress callback -> terminal state -> cleanup.
//!
//! The orchestrator is a long-lived instance owned by the application
//! context and injected wherever uploads are triggered or observed; it
//! guarantees at most one active batch at a time.

pub mod orchestrator;
pub mod progress;
pub mod request;
pub mod retry;
pub mod tracker;
pub mod transport;

pub use orchestrator::{OptimisticEntry, ProgressCallback, UploadOrchestrator};
pub use progress::{polling::PollingProgressSource, realtime::RealtimeProgressSource};
pub use progress::{ProgressSource, ProgressSubscription, SourceEvent};
pub use request::{BuildOutcome, BulkUploadRequest, DroppedFile, UploadRequestBuilder};
pub use retry::RetryPolicy;
pub use tracker::{ProgressTracker, TrackingOutcome};
pub use transport::{
    BulkUploadResponse, FileStatusUpdate, HttpUploadTransport, ProgressData, UploadTransport,
};
