//! Staged-file validation.
//!
//! All checks are independent and accumulated: a file violating several
//! rules reports every applicable error, not just the first. Validation is a
//! pure function of the candidate's observable properties.

use std::path::Path;

use crate::config::LimitsConfig;
use crate::models::upload_file::{FileCandidate, MediaKind};

/// Accumulated validation errors for one candidate file.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates candidate files against configured limits and allow-lists.
pub struct FileValidator {
    limits: LimitsConfig,
}

impl FileValidator {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    fn max_bytes(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Audio => self.limits.max_audio_bytes,
            MediaKind::Image => self.limits.max_image_bytes,
        }
    }

    fn allowed_content_types(&self, kind: MediaKind) -> &[String] {
        match kind {
            MediaKind::Audio => &self.limits.audio_content_types,
            MediaKind::Image => &self.limits.image_content_types,
        }
    }

    fn allowed_extensions(&self, kind: MediaKind) -> &[String] {
        match kind {
            MediaKind::Audio => &self.limits.audio_extensions,
            MediaKind::Image => &self.limits.image_extensions,
        }
    }

    fn check_size(&self, candidate: &FileCandidate) -> Option<String> {
        let max = self.max_bytes(candidate.kind);
        let size = candidate.payload.len() as u64;
        if size > max {
            return Some(format!(
                "File exceeds the {} MiB limit for {} files",
                max / (1024 * 1024),
                candidate.kind
            ));
        }
        None
    }

    fn check_not_empty(&self, candidate: &FileCandidate) -> Option<String> {
        if candidate.payload.is_empty() {
            return Some("File appears to be empty".to_string());
        }
        None
    }

    fn check_content_type(&self, candidate: &FileCandidate) -> Option<String> {
        let allowed = self.allowed_content_types(candidate.kind);
        let normalized = candidate.content_type.to_lowercase();
        if !allowed.iter().any(|ct| ct == &normalized) {
            return Some(format!(
                "Unsupported type {} (allowed: {})",
                candidate.content_type,
                allowed.join(", ")
            ));
        }
        None
    }

    fn check_extension(&self, candidate: &FileCandidate) -> Option<String> {
        let allowed = self.allowed_extensions(candidate.kind);
        let extension = Path::new(&candidate.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match extension {
            Some(ext) if allowed.contains(&ext) => None,
            Some(ext) => Some(format!(
                "Unsupported extension .{} (allowed: {})",
                ext,
                allowed.join(", ")
            )),
            None => Some(format!(
                "File name has no extension (allowed: {})",
                allowed.join(", ")
            )),
        }
    }

    fn check_duration(&self, candidate: &FileCandidate) -> Option<String> {
        // Duration extraction is only attempted for audio; a missing or zero
        // result signals a likely corrupt file.
        if candidate.kind != MediaKind::Audio {
            return None;
        }
        match candidate.duration_seconds {
            Some(d) if d > 0.0 => None,
            _ => Some("Could not determine audio duration; the file may be corrupt".to_string()),
        }
    }

    /// Run every check and accumulate all applicable errors.
    pub fn validate(&self, candidate: &FileCandidate) -> ValidationOutcome {
        let errors = [
            self.check_size(candidate),
            self.check_not_empty(candidate),
            self.check_content_type(candidate),
            self.check_extension(candidate),
            self.check_duration(candidate),
        ]
        .into_iter()
        .flatten()
        .collect();
        ValidationOutcome { errors }
    }
}
