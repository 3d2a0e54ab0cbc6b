//! Realtime progress source: adapts an externally-fed row-update stream
//! (e.g. a backend change feed) into the [`ProgressSource`] interface,
//! filtered to the tracked file ids.

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use scriptorium_core::UploadError;

use crate::progress::{ProgressSource, ProgressSubscription, SourceEvent};
use crate::transport::FileStatusUpdate;

const EVENT_CHANNEL_CAPACITY: usize = 16;

pub struct RealtimeProgressSource {
    feed: Mutex<Option<mpsc::Receiver<FileStatusUpdate>>>,
}

impl RealtimeProgressSource {
    /// Wrap a change-feed receiver. The feed is consumed by the first
    /// subscription; a second subscribe fails.
    pub fn new(feed: mpsc::Receiver<FileStatusUpdate>) -> Self {
        Self {
            feed: Mutex::new(Some(feed)),
        }
    }
}

#[async_trait]
impl ProgressSource for RealtimeProgressSource {
    async fn subscribe(&self, ids: Vec<Uuid>) -> Result<ProgressSubscription, UploadError> {
        let mut feed = self
            .feed
            .lock()
            .await
            .take()
            .ok_or_else(|| UploadError::Tracking("realtime feed already subscribed".to_string()))?;

        let tracked: HashSet<Uuid> = ids.into_iter().collect();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (stop_tx, mut stop_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe = feed.recv() => match maybe {
                        Some(update) => {
                            if !tracked.contains(&update.media_file_id) {
                                continue;
                            }
                            if event_tx
                                .send(SourceEvent::Updates(vec![update]))
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        None => {
                            tracing::warn!("Realtime change feed closed");
                            break;
                        }
                    },
                    _ = stop_rx.recv() => break,
                }
            }
        });

        Ok(ProgressSubscription::from_parts(event_rx, stop_tx))
    }
}
