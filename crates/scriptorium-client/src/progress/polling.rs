//! Polling progress source: fetches the progress endpoint on a fixed
//! interval. Reconciliation fetches never overlap; if a fetch is still
//! outstanding when the timer fires again, the missed tick is skipped.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use scriptorium_core::{SessionProvider, UploadError};

use crate::progress::{ProgressSource, ProgressSubscription, SourceEvent};
use crate::transport::UploadTransport;

const EVENT_CHANNEL_CAPACITY: usize = 16;

pub struct PollingProgressSource {
    transport: Arc<dyn UploadTransport>,
    session: Arc<dyn SessionProvider>,
    poll_interval: Duration,
}

impl PollingProgressSource {
    pub fn new(
        transport: Arc<dyn UploadTransport>,
        session: Arc<dyn SessionProvider>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            session,
            poll_interval,
        }
    }
}

#[async_trait]
impl ProgressSource for PollingProgressSource {
    async fn subscribe(&self, ids: Vec<Uuid>) -> Result<ProgressSubscription, UploadError> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (stop_tx, mut stop_rx) = mpsc::channel(1);

        let transport = self.transport.clone();
        let session = self.session.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::debug!(
                tracked = ids.len(),
                interval_ms = poll_interval.as_millis() as u64,
                "Polling progress source started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // The fetch is awaited inside the tick arm, so a
                        // slow reconciliation delays (never overlaps) the
                        // next one.
                        let event = match session.access_token().await {
                            Ok(token) => match transport.fetch_progress(&ids, &token).await {
                                Ok(data) => SourceEvent::Updates(data.files),
                                Err(e) => SourceEvent::SourceError(e.to_string()),
                            },
                            Err(e) => SourceEvent::SourceError(format!("no session: {}", e)),
                        };
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    _ = stop_rx.recv() => break,
                }
            }

            tracing::debug!("Polling progress source stopped");
        });

        Ok(ProgressSubscription::from_parts(event_rx, stop_tx))
    }
}
