//! Error types module
//!
//! All client-facing failures are unified under [`UploadError`]. Submission
//! errors are classified retryable or not via [`UploadError::is_retryable`];
//! only retryable errors participate in the backoff loop. Per-file backend
//! failures are never surfaced through this type: they arrive as a terminal
//! `failed` status on the progress record instead.

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Missing session context: {0}")]
    MissingSession(String),

    #[error("Batch too large: {count} files (max: {max})")]
    BatchTooLarge { count: usize, max: usize },

    #[error("Another upload is already in progress")]
    UploadInProgress,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Upload request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Rate limited by server")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upload rejected by server: {0}")]
    Rejected(String),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request: {0}")]
    Serialization(String),

    #[error("Tracking error: {0}")]
    Tracking(String),
}

impl UploadError {
    /// Whether a submission attempt that failed with this error may be retried.
    ///
    /// Network/timeout errors, HTTP 5xx, and rate limiting are transient.
    /// Validation, auth, and other 4xx failures propagate immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            UploadError::Network(_) | UploadError::RateLimited => true,
            UploadError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for UploadError {
    fn from(err: serde_json::Error) -> Self {
        UploadError::Serialization(format!("JSON error: {}", err))
    }
}
