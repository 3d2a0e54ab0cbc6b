//! Tracker state-machine tests with a hand-fed progress source.

mod helpers;

use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use helpers::*;
use scriptorium_client::orchestrator::ProgressCallback;
use scriptorium_client::progress::SourceEvent;
use scriptorium_client::tracker::{ProgressTracker, TrackingOutcome};
use scriptorium_core::{BatchSnapshot, ProgressMap, TrackingConfig, UploadStatus};

struct TrackerRig {
    state: Arc<Mutex<ProgressMap>>,
    snapshots: Arc<StdMutex<Vec<BatchSnapshot>>>,
    callback: ProgressCallback,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

fn rig(ids: &[(Uuid, &str)]) -> TrackerRig {
    let records: Vec<_> = ids
        .iter()
        .map(|(id, name)| pending_record(*id, name))
        .collect();
    let state = Arc::new(Mutex::new(ProgressMap::seed_from_records(&records, None)));
    let snapshots: Arc<StdMutex<Vec<BatchSnapshot>>> = Arc::new(StdMutex::new(Vec::new()));
    let sink = snapshots.clone();
    let callback: ProgressCallback = Arc::new(move |snapshot| {
        sink.lock().expect("snapshot sink poisoned").push(snapshot);
    });
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    TrackerRig {
        state,
        snapshots,
        callback,
        shutdown_tx,
        shutdown_rx,
    }
}

#[tokio::test(start_paused = true)]
async fn timeout_preserves_last_known_statuses() {
    let a = Uuid::new_v4();
    let r = rig(&[(a, "a.mp3")]);
    let (source, events, _stop_rx) = manual_source();

    let state = r.state.clone();
    let handle = tokio::spawn({
        let state = state.clone();
        let callback = r.callback.clone();
        async move {
            ProgressTracker::new(TrackingConfig::default())
                .run(&source, vec![a], state, callback, r.shutdown_rx)
                .await
        }
    });

    events
        .send(SourceEvent::Updates(vec![wire_update(
            a,
            "a.mp3",
            UploadStatus::Uploading,
        )]))
        .await
        .expect("tracker is listening");

    // No further events arrive; the deadline elapses.
    let outcome = handle.await.expect("task join");
    assert_eq!(outcome, TrackingOutcome::TimedOut);

    // The record keeps its last-known status instead of a fabricated
    // terminal one.
    let map = state.lock().await;
    assert_eq!(map.status_of(a), Some(&UploadStatus::Uploading));
    assert!(!map.all_terminal());
}

#[tokio::test(start_paused = true)]
async fn consecutive_source_errors_abort_tracking() {
    let a = Uuid::new_v4();
    let r = rig(&[(a, "a.mp3")]);
    let (source, events, _stop_rx) = manual_source();
    let config = TrackingConfig::default();
    let budget = config.max_consecutive_errors;

    let handle = tokio::spawn({
        let state = r.state.clone();
        let callback = r.callback.clone();
        async move {
            ProgressTracker::new(config)
                .run(&source, vec![a], state, callback, r.shutdown_rx)
                .await
        }
    });

    for _ in 0..budget {
        events
            .send(SourceEvent::SourceError("connection refused".to_string()))
            .await
            .expect("tracker is listening");
    }

    let outcome = handle.await.expect("task join");
    assert_eq!(outcome, TrackingOutcome::ErrorAborted);
    assert_eq!(
        r.state.lock().await.status_of(a),
        Some(&UploadStatus::Pending)
    );
}

#[tokio::test(start_paused = true)]
async fn successful_update_resets_the_error_budget() {
    let a = Uuid::new_v4();
    let r = rig(&[(a, "a.mp3")]);
    let (source, events, _stop_rx) = manual_source();

    let handle = tokio::spawn({
        let state = r.state.clone();
        let callback = r.callback.clone();
        async move {
            ProgressTracker::new(TrackingConfig::default())
                .run(&source, vec![a], state, callback, r.shutdown_rx)
                .await
        }
    });

    // Eight errors in total, but never five in a row.
    for _ in 0..4 {
        events
            .send(SourceEvent::SourceError("timeout".to_string()))
            .await
            .expect("tracker is listening");
    }
    events
        .send(SourceEvent::Updates(vec![wire_update(
            a,
            "a.mp3",
            UploadStatus::Uploading,
        )]))
        .await
        .expect("tracker is listening");
    for _ in 0..4 {
        events
            .send(SourceEvent::SourceError("timeout".to_string()))
            .await
            .expect("tracker is listening");
    }
    events
        .send(SourceEvent::Updates(vec![wire_update(
            a,
            "a.mp3",
            UploadStatus::Completed,
        )]))
        .await
        .expect("tracker is listening");

    let outcome = handle.await.expect("task join");
    assert_eq!(outcome, TrackingOutcome::Converged);
}

#[tokio::test(start_paused = true)]
async fn terminal_statuses_never_regress() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let r = rig(&[(a, "a.mp3"), (b, "b.mp3")]);
    let (source, events, _stop_rx) = manual_source();

    let state = r.state.clone();
    let handle = tokio::spawn({
        let state = state.clone();
        let callback = r.callback.clone();
        async move {
            ProgressTracker::new(TrackingConfig::default())
                .run(&source, vec![a, b], state, callback, r.shutdown_rx)
                .await
        }
    });

    events
        .send(SourceEvent::Updates(vec![wire_update(
            a,
            "a.mp3",
            UploadStatus::Completed,
        )]))
        .await
        .expect("tracker is listening");
    // A stale row arriving after the terminal one.
    events
        .send(SourceEvent::Updates(vec![wire_update(
            a,
            "a.mp3",
            UploadStatus::Pending,
        )]))
        .await
        .expect("tracker is listening");
    events
        .send(SourceEvent::Updates(vec![wire_update(
            b,
            "b.mp3",
            UploadStatus::Completed,
        )]))
        .await
        .expect("tracker is listening");

    let outcome = handle.await.expect("task join");
    assert_eq!(outcome, TrackingOutcome::Converged);
    assert_eq!(
        state.lock().await.status_of(a),
        Some(&UploadStatus::Completed)
    );

    // The stale row changed nothing, so it produced no notification.
    assert_eq!(r.snapshots.lock().expect("sink").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_stops_tracking_and_releases_the_subscription() {
    let a = Uuid::new_v4();
    let r = rig(&[(a, "a.mp3")]);
    let (source, _events, mut stop_rx) = manual_source();

    let handle = tokio::spawn({
        let state = r.state.clone();
        let callback = r.callback.clone();
        async move {
            ProgressTracker::new(TrackingConfig::default())
                .run(&source, vec![a], state, callback, r.shutdown_rx)
                .await
        }
    });

    r.shutdown_tx.send(()).await.expect("tracker is listening");
    let outcome = handle.await.expect("task join");
    assert_eq!(outcome, TrackingOutcome::Stopped);

    // Every exit path releases the subscription.
    assert!(stop_rx.recv().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn fully_terminal_seed_converges_without_subscribing() {
    let a = Uuid::new_v4();
    let r = rig(&[(a, "a.mp3")]);
    r.state.lock().await.apply(
        helpers::wire_update(a, "a.mp3", UploadStatus::Failed).into(),
    );
    let (source, _events, _stop_rx) = manual_source();

    let outcome = ProgressTracker::new(TrackingConfig::default())
        .run(&source, vec![a], r.state.clone(), r.callback.clone(), r.shutdown_rx)
        .await;
    assert_eq!(outcome, TrackingOutcome::Converged);
    assert!(r.snapshots.lock().expect("sink").is_empty());
}
