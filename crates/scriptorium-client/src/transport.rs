//! HTTP transport for the bulk upload backend.
//!
//! The submit call serializes each file plus its metadata into indexed
//! multipart slots (`file_{i}` / `metadata_{i}`) and wraps the request in
//! the retry policy. Progress and resume fetches are single attempts; the
//! tracker's error budget handles their transient failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use scriptorium_core::config::RetryConfig;
use scriptorium_core::{StatusUpdate, UploadError, UploadResult, UploadStatus};

use crate::request::BulkUploadRequest;
use crate::retry::RetryPolicy;

const UPLOAD_PATH: &str = "/bulk-upload";
const PROGRESS_PATH: &str = "/bulk-upload/progress";
const RECENT_PATH: &str = "/bulk-upload/recent";
const CLIENT_TIMEOUT_SECS: u64 = 60;

/// Standard response envelope used by every backend endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEnvelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    details: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUploadResponse {
    pub total_files: usize,
    pub batch_id: String,
    pub media_records: Vec<scriptorium_core::MediaRecord>,
}

/// One row from the progress (or recent-records) endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatusUpdate {
    pub media_file_id: Uuid,
    pub file_name: String,
    pub status: UploadStatus,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FileStatusUpdate> for StatusUpdate {
    fn from(u: FileStatusUpdate) -> Self {
        StatusUpdate {
            media_file_id: u.media_file_id,
            file_name: u.file_name,
            status: u.status,
            error: u.error,
            result: u.download_url.map(|download_url| UploadResult {
                download_url,
                size_bytes: None,
                version: None,
            }),
        }
    }
}

/// Backend-reported aggregate progress. Informational only: convergence is
/// always decided from the per-file statuses, which the aggregate may lag
/// or contradict.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateProgress {
    pub percentage: f64,
    pub status: UploadStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressData {
    pub files: Vec<FileStatusUpdate>,
    pub progress: AggregateProgress,
}

#[derive(Debug, Deserialize)]
struct RecentData {
    files: Vec<FileStatusUpdate>,
}

/// Network boundary for batch submission and status reconciliation.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Submit a batch. Must not mutate caller-owned upload files.
    async fn submit(
        &self,
        files: &[BulkUploadRequest],
        token: &str,
    ) -> Result<BulkUploadResponse, UploadError>;

    /// Fetch current status for the tracked file ids.
    async fn fetch_progress(&self, ids: &[Uuid], token: &str)
        -> Result<ProgressData, UploadError>;

    /// Fetch records created since `since`, for resume-on-reload.
    async fn fetch_resumable(
        &self,
        since: DateTime<Utc>,
        token: &str,
    ) -> Result<Vec<FileStatusUpdate>, UploadError>;
}

/// Production transport over reqwest.
pub struct HttpUploadTransport {
    client: Client,
    base_url: String,
    max_batch_size: usize,
    retry: RetryPolicy,
}

impl HttpUploadTransport {
    pub fn new(
        base_url: impl Into<String>,
        max_batch_size: usize,
        retry: RetryConfig,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_batch_size,
            retry: RetryPolicy::new(retry),
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_form(files: &[BulkUploadRequest]) -> Result<Form, UploadError> {
        let mut form = Form::new();
        for (i, file) in files.iter().enumerate() {
            let part = Part::bytes(file.payload.to_vec())
                .file_name(file.file_name.clone())
                .mime_str(&file.content_type)
                .map_err(|e| {
                    UploadError::Serialization(format!(
                        "Invalid content type {}: {}",
                        file.content_type, e
                    ))
                })?;
            form = form
                .part(format!("file_{}", i), part)
                .text(format!("metadata_{}", i), serde_json::to_string(&file.metadata)?);
        }
        Ok(form)
    }

    async fn submit_once(
        &self,
        files: &[BulkUploadRequest],
        token: &str,
    ) -> Result<BulkUploadResponse, UploadError> {
        let form = Self::build_form(files)?;
        let response = self
            .client
            .post(self.build_url(UPLOAD_PATH))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(net_err)?;

        parse_envelope(response).await
    }
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn submit(
        &self,
        files: &[BulkUploadRequest],
        token: &str,
    ) -> Result<BulkUploadResponse, UploadError> {
        if files.len() > self.max_batch_size {
            return Err(UploadError::BatchTooLarge {
                count: files.len(),
                max: self.max_batch_size,
            });
        }

        tracing::info!(file_count = files.len(), "Submitting bulk upload batch");
        self.retry
            .run("bulk_upload_submit", || self.submit_once(files, token))
            .await
    }

    async fn fetch_progress(
        &self,
        ids: &[Uuid],
        token: &str,
    ) -> Result<ProgressData, UploadError> {
        let response = self
            .client
            .post(self.build_url(PROGRESS_PATH))
            .bearer_auth(token)
            .json(&serde_json::json!({ "mediaFileIds": ids }))
            .send()
            .await
            .map_err(net_err)?;

        parse_envelope(response).await
    }

    async fn fetch_resumable(
        &self,
        since: DateTime<Utc>,
        token: &str,
    ) -> Result<Vec<FileStatusUpdate>, UploadError> {
        let response = self
            .client
            .get(self.build_url(RECENT_PATH))
            .bearer_auth(token)
            .query(&[("since", since.to_rfc3339())])
            .send()
            .await
            .map_err(net_err)?;

        let data: RecentData = parse_envelope(response).await?;
        Ok(data.files)
    }
}

fn net_err(e: reqwest::Error) -> UploadError {
    UploadError::Network(e.to_string())
}

/// Map a response to the typed payload, turning non-success statuses and
/// `success: false` envelopes into descriptive errors. Structured error
/// bodies are preferred; status text is the fallback.
async fn parse_envelope<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, UploadError> {
    let status = response.status();
    let body = response.text().await.map_err(net_err)?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
            .ok()
            .and_then(|e| match (e.error, e.details) {
                (Some(error), Some(details)) => Some(format!("{} ({})", error, details)),
                (Some(error), None) => Some(error),
                (None, Some(details)) => Some(details),
                (None, None) => None,
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UploadError::Unauthorized(message),
            StatusCode::TOO_MANY_REQUESTS => UploadError::RateLimited,
            _ => UploadError::Http {
                status: status.as_u16(),
                message,
            },
        });
    }

    let envelope: ApiEnvelope<T> = serde_json::from_str(&body)
        .map_err(|e| UploadError::InvalidResponse(format!("Malformed response body: {}", e)))?;

    if !envelope.success {
        let message = envelope
            .error
            .or(envelope.details)
            .unwrap_or_else(|| "no error message provided".to_string());
        return Err(UploadError::Rejected(message));
    }

    envelope
        .data
        .ok_or_else(|| UploadError::InvalidResponse("Missing data field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use scriptorium_core::BulkUploadMetadata;

    fn request(name: &str) -> BulkUploadRequest {
        BulkUploadRequest {
            client_id: Uuid::new_v4(),
            file_name: name.to_string(),
            content_type: "audio/mpeg".to_string(),
            payload: Bytes::from_static(b"data"),
            metadata: BulkUploadMetadata {
                language_id: "lang-1".to_string(),
                version_id: "ver-1".to_string(),
                book_id: "book-gen".to_string(),
                chapter_id: "ch-1".to_string(),
                start_verse_id: "v-1".to_string(),
                end_verse_id: "v-5".to_string(),
                duration_seconds: Some(4.0),
                verse_timings: None,
                tag_ids: None,
                file_name: name.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_batch_size_enforced_before_any_network_call() {
        // base_url points nowhere; the size check must reject first.
        let transport =
            HttpUploadTransport::new("http://127.0.0.1:1", 2, RetryConfig::default()).unwrap();
        let files: Vec<_> = (0..3).map(|i| request(&format!("f{}.mp3", i))).collect();

        let result = transport.submit(&files, "token").await;
        assert!(matches!(
            result,
            Err(UploadError::BatchTooLarge { count: 3, max: 2 })
        ));
    }

    #[test]
    fn test_build_form_indexes_slots() {
        let files = vec![request("a.mp3"), request("b.mp3")];
        // Form contents are opaque, but construction must succeed for
        // well-formed content types.
        assert!(HttpUploadTransport::build_form(&files).is_ok());
    }

    #[test]
    fn test_build_form_rejects_bad_content_type() {
        let mut file = request("a.mp3");
        file.content_type = "not a mime".to_string();
        assert!(matches!(
            HttpUploadTransport::build_form(&[file]),
            Err(UploadError::Serialization(_))
        ));
    }

    #[test]
    fn test_status_update_conversion_builds_result() {
        let wire = FileStatusUpdate {
            media_file_id: Uuid::new_v4(),
            file_name: "a.mp3".to_string(),
            status: UploadStatus::Completed,
            download_url: Some("https://cdn.example.com/a.mp3".to_string()),
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let update: StatusUpdate = wire.into();
        assert_eq!(
            update.result.unwrap().download_url,
            "https://cdn.example.com/a.mp3"
        );
    }
}
