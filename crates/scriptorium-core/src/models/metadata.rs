//! Transport-ready per-file metadata, serialized into the `metadata_{i}`
//! multipart slot. Built once at submission time and immutable thereafter.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerseTiming {
    pub verse_id: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUploadMetadata {
    pub language_id: String,
    pub version_id: String,
    pub book_id: String,
    pub chapter_id: String,
    pub start_verse_id: String,
    pub end_verse_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse_timings: Option<Vec<VerseTiming>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<String>>,
    pub file_name: String,
}
