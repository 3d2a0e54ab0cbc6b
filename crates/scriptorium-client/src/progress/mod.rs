//! Progress sources: interchangeable channels delivering reconciled status
//! events for a tracked set of files.
//!
//! The tracker depends only on the [`ProgressSource`] interface; whether
//! status arrives by polling a progress endpoint or by subscribing to a
//! realtime change feed is an injection decision.

pub mod polling;
pub mod realtime;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use scriptorium_core::UploadError;

use crate::transport::FileStatusUpdate;

/// One delivery from a progress source.
#[derive(Debug)]
pub enum SourceEvent {
    /// Reconciled statuses for some or all tracked files.
    Updates(Vec<FileStatusUpdate>),
    /// A reconciliation attempt failed (network/parse). The tracker counts
    /// these against its consecutive-error budget.
    SourceError(String),
}

/// Live subscription to a progress source. Dropping it (or calling
/// [`ProgressSubscription::stop`]) releases the source's timer or channel.
pub struct ProgressSubscription {
    events: mpsc::Receiver<SourceEvent>,
    stop_tx: mpsc::Sender<()>,
}

impl ProgressSubscription {
    pub fn from_parts(events: mpsc::Receiver<SourceEvent>, stop_tx: mpsc::Sender<()>) -> Self {
        Self { events, stop_tx }
    }

    /// Next event, or None when the source has ended.
    pub async fn next_event(&mut self) -> Option<SourceEvent> {
        self.events.recv().await
    }

    /// Signal the source to stop delivering. Idempotent.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(()).await;
    }
}

#[async_trait]
pub trait ProgressSource: Send + Sync {
    /// Begin delivering status events for the given file ids.
    async fn subscribe(&self, ids: Vec<Uuid>) -> Result<ProgressSubscription, UploadError>;
}
