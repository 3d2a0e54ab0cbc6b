//! Configuration module
//!
//! Plain configuration structs with defaults and environment overrides for
//! upload limits, the submission retry policy, and progress tracking.
//! Environment variables use the `SCRIPTORIUM_` prefix; unset or unparseable
//! values fall back to the defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

const MAX_BATCH_SIZE: usize = 80;
const MAX_AUDIO_BYTES: u64 = 500 * 1024 * 1024;
const MAX_IMAGE_BYTES: u64 = 50 * 1024 * 1024;
const RETRY_MAX_RETRIES: u32 = 3;
const RETRY_INITIAL_DELAY_MS: u64 = 1_000;
const RETRY_MULTIPLIER: f64 = 2.0;
const RETRY_MAX_DELAY_MS: u64 = 30_000;
const TRACKING_POLL_INTERVAL_MS: u64 = 2_000;
const TRACKING_MAX_DURATION_SECS: u64 = 600;
const TRACKING_MAX_CONSECUTIVE_ERRORS: u32 = 5;
const CLEANUP_GRACE_MS: u64 = 2_000;
const RESUME_WINDOW_SECS: u64 = 2 * 60 * 60;

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Per-kind size limits and allow-lists for staged files.
#[derive(Clone, Debug)]
pub struct LimitsConfig {
    pub max_audio_bytes: u64,
    pub max_image_bytes: u64,
    pub audio_content_types: Vec<String>,
    pub audio_extensions: Vec<String>,
    pub image_content_types: Vec<String>,
    pub image_extensions: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_audio_bytes: MAX_AUDIO_BYTES,
            max_image_bytes: MAX_IMAGE_BYTES,
            audio_content_types: vec![
                "audio/mpeg".to_string(),
                "audio/mp3".to_string(),
                "audio/wav".to_string(),
                "audio/x-wav".to_string(),
                "audio/mp4".to_string(),
                "audio/x-m4a".to_string(),
                "audio/flac".to_string(),
                "audio/ogg".to_string(),
            ],
            audio_extensions: vec![
                "mp3".to_string(),
                "wav".to_string(),
                "m4a".to_string(),
                "flac".to_string(),
                "ogg".to_string(),
            ],
            image_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            image_extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
            ],
        }
    }
}

/// Exponential backoff policy for the submission network call.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: RETRY_MAX_RETRIES,
            initial_delay: Duration::from_millis(RETRY_INITIAL_DELAY_MS),
            multiplier: RETRY_MULTIPLIER,
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
        }
    }
}

/// Progress tracking policy: reconciliation interval, hard ceiling on the
/// total tracking duration, and the consecutive-failure budget after which
/// tracking is aborted.
#[derive(Clone, Debug)]
pub struct TrackingConfig {
    pub poll_interval: Duration,
    pub max_duration: Duration,
    pub max_consecutive_errors: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(TRACKING_POLL_INTERVAL_MS),
            max_duration: Duration::from_secs(TRACKING_MAX_DURATION_SECS),
            max_consecutive_errors: TRACKING_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

/// Top-level upload configuration.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub limits: LimitsConfig,
    pub retry: RetryConfig,
    pub tracking: TrackingConfig,
    /// Maximum number of files per submitted batch.
    pub max_batch_size: usize,
    /// Delay between convergence and resource teardown, so observers can
    /// render the final state before the batch is released.
    pub cleanup_grace: Duration,
    /// How far back `resume_uploads` looks for non-terminal records.
    pub resume_window: Duration,
}

impl UploadConfig {
    pub fn from_env() -> Self {
        Self {
            limits: LimitsConfig {
                max_audio_bytes: env_parse("SCRIPTORIUM_MAX_AUDIO_BYTES", MAX_AUDIO_BYTES),
                max_image_bytes: env_parse("SCRIPTORIUM_MAX_IMAGE_BYTES", MAX_IMAGE_BYTES),
                ..LimitsConfig::default()
            },
            retry: RetryConfig {
                max_retries: env_parse("SCRIPTORIUM_RETRY_MAX_RETRIES", RETRY_MAX_RETRIES),
                initial_delay: Duration::from_millis(env_parse(
                    "SCRIPTORIUM_RETRY_INITIAL_DELAY_MS",
                    RETRY_INITIAL_DELAY_MS,
                )),
                multiplier: env_parse("SCRIPTORIUM_RETRY_MULTIPLIER", RETRY_MULTIPLIER),
                max_delay: Duration::from_millis(env_parse(
                    "SCRIPTORIUM_RETRY_MAX_DELAY_MS",
                    RETRY_MAX_DELAY_MS,
                )),
            },
            tracking: TrackingConfig {
                poll_interval: Duration::from_millis(env_parse(
                    "SCRIPTORIUM_POLL_INTERVAL_MS",
                    TRACKING_POLL_INTERVAL_MS,
                )),
                max_duration: Duration::from_secs(env_parse(
                    "SCRIPTORIUM_MAX_TRACKING_SECS",
                    TRACKING_MAX_DURATION_SECS,
                )),
                max_consecutive_errors: env_parse(
                    "SCRIPTORIUM_MAX_CONSECUTIVE_ERRORS",
                    TRACKING_MAX_CONSECUTIVE_ERRORS,
                ),
            },
            max_batch_size: env_parse("SCRIPTORIUM_MAX_BATCH_SIZE", MAX_BATCH_SIZE),
            cleanup_grace: Duration::from_millis(env_parse(
                "SCRIPTORIUM_CLEANUP_GRACE_MS",
                CLEANUP_GRACE_MS,
            )),
            resume_window: Duration::from_secs(env_parse(
                "SCRIPTORIUM_RESUME_WINDOW_SECS",
                RESUME_WINDOW_SECS,
            )),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            limits: LimitsConfig::default(),
            retry: RetryConfig::default(),
            tracking: TrackingConfig::default(),
            max_batch_size: MAX_BATCH_SIZE,
            cleanup_grace: Duration::from_millis(CLEANUP_GRACE_MS),
            resume_window: Duration::from_secs(RESUME_WINDOW_SECS),
        }
    }
}
