//! Scriptorium Core Library
//!
//! This crate provides the domain models, validation, configuration, and error
//! types shared by the Scriptorium bulk upload client. It has no networking of
//! its own; the HTTP transport and orchestration live in `scriptorium-client`.

pub mod config;
pub mod error;
pub mod models;
pub mod resolver;
pub mod session;
pub mod telemetry;
pub mod validation;

// Re-export commonly used types
pub use config::{LimitsConfig, RetryConfig, TrackingConfig, UploadConfig};
pub use error::UploadError;
pub use models::metadata::{BulkUploadMetadata, VerseTiming};
pub use models::progress::{
    BatchSnapshot, BatchSummary, FileProgress, ProgressMap, StatusUpdate, UploadResult,
};
pub use models::record::{MediaRecord, UploadStatus};
pub use models::upload_file::{FileCandidate, MediaKind, TargetSelection, UploadFile};
pub use resolver::{Confidence, FilenameMetadataResolver, NoInferenceResolver, ResolvedReference};
pub use session::{SessionContext, SessionProvider, StaticSessionProvider};
pub use validation::{FileValidator, ValidationOutcome};
