//! Locally staged files awaiting upload.
//!
//! An [`UploadFile`] is created when a local file is accepted into the
//! staging area, mutated as the caller selects targets or re-runs
//! validation, and dropped when discarded or after its batch terminates.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use crate::resolver::{Confidence, FilenameMetadataResolver, ResolvedReference};
use crate::validation::FileValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Image,
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Image => write!(f, "image"),
        }
    }
}

/// A candidate local file, before staging. Holds only the observable
/// properties the validator and resolver need.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub file_name: String,
    pub content_type: String,
    pub kind: MediaKind,
    pub payload: Bytes,
    /// Extracted duration in seconds, if extraction was attempted.
    pub duration_seconds: Option<f64>,
}

/// Target identifiers selected by the caller. All four must be set before a
/// file becomes upload-eligible.
#[derive(Debug, Clone, Default)]
pub struct TargetSelection {
    pub book_id: Option<String>,
    pub chapter_id: Option<String>,
    pub start_verse_id: Option<String>,
    pub end_verse_id: Option<String>,
}

impl TargetSelection {
    pub fn is_complete(&self) -> bool {
        [
            &self.book_id,
            &self.chapter_id,
            &self.start_verse_id,
            &self.end_verse_id,
        ]
        .iter()
        .all(|id| id.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// Names of the target fields still missing, for drop reporting.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let fields: [(&'static str, &Option<String>); 4] = [
            ("book", &self.book_id),
            ("chapter", &self.chapter_id),
            ("start verse", &self.start_verse_id),
            ("end verse", &self.end_verse_id),
        ];
        for (name, value) in fields {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                missing.push(name);
            }
        }
        missing
    }
}

/// One local file staged for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub id: Uuid,
    pub file_name: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub kind: MediaKind,
    pub payload: Bytes,
    pub duration_seconds: Option<f64>,
    pub inferred: ResolvedReference,
    pub validation_errors: Vec<String>,
    pub target: TargetSelection,
    pub staged_at: DateTime<Utc>,
}

impl UploadFile {
    /// Accept a candidate into the staging area: validate it, resolve
    /// filename metadata, and prefill the target selection when the
    /// inference is high-confidence.
    pub fn stage(
        candidate: FileCandidate,
        validator: &FileValidator,
        resolver: &dyn FilenameMetadataResolver,
    ) -> Self {
        let outcome = validator.validate(&candidate);
        let inferred = resolver.resolve(&candidate.file_name);

        let mut target = TargetSelection::default();
        if inferred.confidence >= Confidence::High {
            target.book_id = inferred.book_id.clone();
            target.chapter_id = inferred.chapter_id.clone();
            target.start_verse_id = inferred.start_verse_id.clone();
            target.end_verse_id = inferred.end_verse_id.clone();
        }

        if !outcome.errors.is_empty() {
            tracing::debug!(
                file_name = %candidate.file_name,
                errors = ?outcome.errors,
                "Staged file has validation errors"
            );
        }

        Self {
            id: Uuid::new_v4(),
            size_bytes: candidate.payload.len() as u64,
            file_name: candidate.file_name,
            content_type: candidate.content_type,
            kind: candidate.kind,
            payload: candidate.payload,
            duration_seconds: candidate.duration_seconds,
            inferred,
            validation_errors: outcome.errors,
            target,
            staged_at: Utc::now(),
        }
    }

    /// Re-run validation, e.g. after the caller edits file properties.
    pub fn revalidate(&mut self, validator: &FileValidator) {
        let candidate = FileCandidate {
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            kind: self.kind,
            payload: self.payload.clone(),
            duration_seconds: self.duration_seconds,
        };
        self.validation_errors = validator.validate(&candidate).errors;
    }

    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }

    /// Upload-eligible: valid AND all four target identifiers set.
    pub fn is_upload_eligible(&self) -> bool {
        self.is_valid() && self.target.is_complete()
    }
}
