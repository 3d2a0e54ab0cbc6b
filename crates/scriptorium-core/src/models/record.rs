//! Server-acknowledged media records and the per-file status vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

/// Per-file upload status.
///
/// Closed variant set with an explicit wire mapping. Backend status strings
/// outside the known vocabulary map to [`UploadStatus::Unknown`] instead of
/// being coerced to one of the known states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Failed,
    Unknown(String),
}

impl UploadStatus {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "pending" => UploadStatus::Pending,
            "uploading" => UploadStatus::Uploading,
            "completed" => UploadStatus::Completed,
            "failed" => UploadStatus::Failed,
            other => UploadStatus::Unknown(other.to_string()),
        }
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Failed)
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Uploading => write!(f, "uploading"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Failed => write!(f, "failed"),
            UploadStatus::Unknown(s) => write!(f, "{}", s),
        }
    }
}

impl From<String> for UploadStatus {
    fn from(s: String) -> Self {
        UploadStatus::from_wire(&s)
    }
}

impl From<UploadStatus> for String {
    fn from(status: UploadStatus) -> Self {
        status.to_string()
    }
}

/// Server acknowledgement for one submitted file, returned at submission
/// time. Seeds the progress map for tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub media_file_id: Uuid,
    pub file_name: String,
    pub status: UploadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
