//! Filename metadata resolver interface.
//!
//! Filename parsing heuristics live outside this crate. The client only
//! depends on this narrow interface: given a file name, return best-effort
//! scripture references plus a confidence score.

use serde::{Deserialize, Serialize};

/// How reliable filename-derived metadata is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    None,
    Low,
    Medium,
    High,
}

/// Best-effort scripture reference inferred from a file name.
#[derive(Debug, Clone, Default)]
pub struct ResolvedReference {
    pub book_id: Option<String>,
    pub chapter_id: Option<String>,
    pub start_verse_id: Option<String>,
    pub end_verse_id: Option<String>,
    pub confidence: Confidence,
    pub errors: Vec<String>,
}

/// External collaborator: maps a file name to a structured reference.
/// Implementations must be pure and cheap; no network.
pub trait FilenameMetadataResolver: Send + Sync {
    fn resolve(&self, file_name: &str) -> ResolvedReference;
}

/// Resolver that never infers anything. Used by hosts without filename
/// heuristics; every staged file starts with an empty target selection.
pub struct NoInferenceResolver;

impl FilenameMetadataResolver for NoInferenceResolver {
    fn resolve(&self, _file_name: &str) -> ResolvedReference {
        ResolvedReference::default()
    }
}
