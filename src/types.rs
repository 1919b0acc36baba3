use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Zero-based position of an item; the only key shared by the vector index
/// and the metadata store.
pub type Ordinal = usize;

/// Per-item metadata, positionally aligned with the vectors of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(default)]
    pub filename: String,
    pub path: String,
}

impl MetadataRecord {
    /// The externally addressable name. Records written without a filename
    /// fall back to the last component of `path`. Empty if neither names a
    /// file.
    pub fn resolved_filename(&self) -> &str {
        if !self.filename.is_empty() {
            return &self.filename;
        }
        let trimmed = self.path.trim_end_matches(['/', '\\']);
        trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
    }
}

/// A raw neighbor returned by the vector index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub ordinal: Ordinal,
    /// Squared Euclidean distance; smaller is more similar.
    pub distance: f32,
}

/// Why a hit could not be fully enriched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentFailure {
    /// Stage that failed: `image`, `caption` or `explanation`.
    pub stage: String,
    /// Error kind, e.g. `timeout` or `caption`.
    pub kind: String,
    pub message: String,
}

/// A search hit with its caption and explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub ordinal: Ordinal,
    pub distance: f32,
    pub filename: String,
    /// URL path the image is served from.
    pub path: String,
    pub caption: Option<String>,
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_error: Option<EnrichmentFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    /// The clamped result count that was actually requested from the index.
    pub top_k: usize,
    pub results: Vec<SearchResult>,
}

/// An item the builder could not index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedItem {
    pub filename: String,
    pub reason: String,
}

/// Outcome of an index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub indexed: usize,
    pub skipped: Vec<SkippedItem>,
    pub dimension: usize,
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
