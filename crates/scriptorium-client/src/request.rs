//! Assembles per-file upload requests from staged files.
//!
//! Building is deterministic and has no network side effects. Ineligible
//! files are filtered out and reported rather than failing the batch;
//! missing session context fails the whole build because it is a caller
//! configuration error.

use bytes::Bytes;
use uuid::Uuid;

use scriptorium_core::{BulkUploadMetadata, SessionContext, UploadError, UploadFile};

/// Transport-ready unit for one file: payload plus immutable metadata.
#[derive(Debug, Clone)]
pub struct BulkUploadRequest {
    /// Client-generated id of the staged file this request was built from.
    pub client_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub payload: Bytes,
    pub metadata: BulkUploadMetadata,
}

/// A staged file excluded from the batch, with the reasons why.
#[derive(Debug, Clone)]
pub struct DroppedFile {
    pub id: Uuid,
    pub file_name: String,
    pub reasons: Vec<String>,
}

#[derive(Debug)]
pub struct BuildOutcome {
    pub requests: Vec<BulkUploadRequest>,
    pub dropped: Vec<DroppedFile>,
}

pub struct UploadRequestBuilder;

impl UploadRequestBuilder {
    pub fn build(
        files: &[UploadFile],
        session: &SessionContext,
    ) -> Result<BuildOutcome, UploadError> {
        session.validate()?;

        let mut requests = Vec::with_capacity(files.len());
        let mut dropped = Vec::new();

        for file in files {
            if !file.is_upload_eligible() {
                let mut reasons = file.validation_errors.clone();
                for field in file.target.missing_fields() {
                    reasons.push(format!("no {} selected", field));
                }
                tracing::warn!(
                    file_id = %file.id,
                    file_name = %file.file_name,
                    reasons = ?reasons,
                    "Dropping ineligible file from batch"
                );
                dropped.push(DroppedFile {
                    id: file.id,
                    file_name: file.file_name.clone(),
                    reasons,
                });
                continue;
            }

            // Eligibility guarantees all four target ids are present.
            let target = &file.target;
            let metadata = BulkUploadMetadata {
                language_id: session.language_id.clone(),
                version_id: session.version_id.clone(),
                book_id: target.book_id.clone().unwrap_or_default(),
                chapter_id: target.chapter_id.clone().unwrap_or_default(),
                start_verse_id: target.start_verse_id.clone().unwrap_or_default(),
                end_verse_id: target.end_verse_id.clone().unwrap_or_default(),
                duration_seconds: file.duration_seconds,
                verse_timings: None,
                tag_ids: None,
                file_name: file.file_name.clone(),
            };

            requests.push(BulkUploadRequest {
                client_id: file.id,
                file_name: file.file_name.clone(),
                content_type: file.content_type.clone(),
                payload: file.payload.clone(),
                metadata,
            });
        }

        tracing::debug!(
            eligible = requests.len(),
            dropped = dropped.len(),
            "Built bulk upload requests"
        );

        Ok(BuildOutcome { requests, dropped })
    }
}
