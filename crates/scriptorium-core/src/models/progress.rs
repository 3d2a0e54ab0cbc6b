//! Per-file progress records and the batch progress map.
//!
//! The progress map is the authoritative client-side view of a submitted
//! batch. Its one hard invariant: a record that reached a terminal status
//! (`completed` or `failed`) never transitions again, regardless of what a
//! late reconciliation reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::record::{MediaRecord, UploadStatus};

/// Result payload available once a file completes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

/// Continuously-updated status view for one tracked file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileProgress {
    pub media_file_id: Uuid,
    pub file_name: String,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<UploadResult>,
    pub updated_at: DateTime<Utc>,
}

impl FileProgress {
    pub fn from_record(record: &MediaRecord) -> Self {
        Self {
            media_file_id: record.media_file_id,
            file_name: record.file_name.clone(),
            status: record.status.clone(),
            error: record.error.clone(),
            result: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One reconciled status report for a tracked file, already mapped from the
/// wire into the closed status vocabulary.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub media_file_id: Uuid,
    pub file_name: String,
    pub status: UploadStatus,
    pub error: Option<String>,
    pub result: Option<UploadResult>,
}

/// Aggregate counts derived from the progress map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub pending: usize,
    pub uploading: usize,
    pub completed: usize,
    pub failed: usize,
    pub unknown: usize,
    pub total: usize,
}

impl BatchSummary {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed + self.failed == self.total
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Read-only view handed to progress observers. Observers must not assume
/// identifiers are stable across the provisional seed and the server reseed.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSnapshot {
    pub batch_id: Option<String>,
    pub files: Vec<FileProgress>,
    pub summary: BatchSummary,
}

/// The per-batch progress map. Mutated only by the tracker (and the
/// orchestrator during seeding); callers only ever see snapshots.
#[derive(Debug, Default)]
pub struct ProgressMap {
    batch_id: Option<String>,
    rows: BTreeMap<Uuid, FileProgress>,
}

impl ProgressMap {
    /// All-pending provisional seed, keyed by client-generated ids. Gives
    /// observers immediate feedback before the submission call resolves.
    pub fn provisional(entries: impl IntoIterator<Item = (Uuid, String)>) -> Self {
        let now = Utc::now();
        let rows = entries
            .into_iter()
            .map(|(id, file_name)| {
                (
                    id,
                    FileProgress {
                        media_file_id: id,
                        file_name,
                        status: UploadStatus::Pending,
                        error: None,
                        result: None,
                        updated_at: now,
                    },
                )
            })
            .collect();
        Self {
            batch_id: None,
            rows,
        }
    }

    /// Authoritative seed from the submission response.
    pub fn seed_from_records(records: &[MediaRecord], batch_id: Option<String>) -> Self {
        let rows = records
            .iter()
            .map(|r| (r.media_file_id, FileProgress::from_record(r)))
            .collect();
        Self { batch_id, rows }
    }

    /// Seed from reconciled updates, e.g. when re-attaching to in-flight
    /// uploads after a reload.
    pub fn seed_from_updates(updates: impl IntoIterator<Item = StatusUpdate>) -> Self {
        let now = Utc::now();
        let rows = updates
            .into_iter()
            .map(|u| {
                (
                    u.media_file_id,
                    FileProgress {
                        media_file_id: u.media_file_id,
                        file_name: u.file_name,
                        status: u.status,
                        error: u.error,
                        result: u.result,
                        updated_at: now,
                    },
                )
            })
            .collect();
        Self {
            batch_id: None,
            rows,
        }
    }

    pub fn tracked_ids(&self) -> Vec<Uuid> {
        self.rows.keys().copied().collect()
    }

    /// Merge one reconciled update. Returns true if the stored record
    /// changed. No-op when the reported status equals the stored one, when
    /// the stored status is already terminal, or when the id is untracked.
    pub fn apply(&mut self, update: StatusUpdate) -> bool {
        let Some(row) = self.rows.get_mut(&update.media_file_id) else {
            tracing::debug!(
                media_file_id = %update.media_file_id,
                "Ignoring update for untracked file"
            );
            return false;
        };

        if row.status.is_terminal() {
            if update.status != row.status {
                tracing::debug!(
                    media_file_id = %update.media_file_id,
                    stored = %row.status,
                    reported = %update.status,
                    "Ignoring status regression for terminal record"
                );
            }
            return false;
        }

        if update.status == row.status {
            return false;
        }

        row.status = update.status;
        row.error = update.error;
        if update.result.is_some() {
            row.result = update.result;
        }
        row.updated_at = Utc::now();
        true
    }

    /// Merge a batch of updates; returns true if anything changed.
    pub fn apply_all(&mut self, updates: impl IntoIterator<Item = StatusUpdate>) -> bool {
        let mut changed = false;
        for update in updates {
            changed |= self.apply(update);
        }
        changed
    }

    /// Convergence test: every tracked record is terminal. Decided purely
    /// from per-file statuses, never from a backend aggregate.
    pub fn all_terminal(&self) -> bool {
        !self.rows.is_empty() && self.rows.values().all(FileProgress::is_terminal)
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.rows.len(),
            ..BatchSummary::default()
        };
        for row in self.rows.values() {
            match &row.status {
                UploadStatus::Pending => summary.pending += 1,
                UploadStatus::Uploading => summary.uploading += 1,
                UploadStatus::Completed => summary.completed += 1,
                UploadStatus::Failed => summary.failed += 1,
                UploadStatus::Unknown(_) => summary.unknown += 1,
            }
        }
        summary
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        BatchSnapshot {
            batch_id: self.batch_id.clone(),
            files: self.rows.values().cloned().collect(),
            summary: self.summary(),
        }
    }

    pub fn status_of(&self, id: Uuid) -> Option<&UploadStatus> {
        self.rows.get(&id).map(|r| &r.status)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
