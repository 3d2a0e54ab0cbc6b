//! Session interfaces: the per-project context required to build upload
//! requests, and the provider of bearer tokens for authenticated calls.

use async_trait::async_trait;

use crate::error::UploadError;

/// Language/version identifiers required for every upload request. Missing
/// values are a caller configuration error, not a per-file error.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub language_id: String,
    pub version_id: String,
}

impl SessionContext {
    pub fn new(language_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            language_id: language_id.into(),
            version_id: version_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        if self.language_id.trim().is_empty() {
            return Err(UploadError::MissingSession(
                "language identifier is not set".to_string(),
            ));
        }
        if self.version_id.trim().is_empty() {
            return Err(UploadError::MissingSession(
                "version identifier is not set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Supplies the bearer token for authenticated backend calls. May be
/// asynchronous (e.g. a refreshing OAuth session) and may fail when no
/// session is available.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn access_token(&self) -> anyhow::Result<String>;
}

/// Provider backed by a fixed token.
pub struct StaticSessionProvider {
    token: String,
}

impl StaticSessionProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn access_token(&self) -> anyhow::Result<String> {
        Ok(self.token.clone())
    }
}
