use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlimpseError {
    // Configuration errors (fatal at startup)
    #[error("config error: {0}")]
    Config(String),

    #[error("cannot read artifact {}: {source}", .path.display())]
    ArtifactUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact {}: {reason}", .path.display())]
    MalformedArtifact { path: PathBuf, reason: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index/metadata length mismatch: index has {vectors} vectors, metadata has {records} records")]
    LengthMismatch { vectors: usize, records: usize },

    // User input errors
    #[error("query cannot be empty")]
    EmptyQuery,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Collaborator errors
    #[error("encoder error: {0}")]
    Encoder(String),

    #[error("caption error: {0}")]
    Caption(String),

    #[error("explanation error: {0}")]
    Explanation(String),

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: &'static str, after_ms: u64 },

    // Build errors
    #[error("cannot read {filename}: {reason}")]
    BuildItem { filename: String, reason: String },

    #[error("cannot read source directory {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no images indexed from {} ({skipped} skipped)", .dir.display())]
    NothingIndexed { dir: PathBuf, skipped: usize },

    // Index errors
    #[error("index error: {0}")]
    Index(String),

    // Serialization errors
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode serialization error: {0}")]
    Bincode(String),

    // IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    // Internal
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<Box<bincode::ErrorKind>> for GlimpseError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        GlimpseError::Bincode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GlimpseError>;

impl GlimpseError {
    pub fn status_code(&self) -> u16 {
        match self {
            GlimpseError::EmptyQuery | GlimpseError::InvalidRequest(_) => 400,

            GlimpseError::Encoder(_)
            | GlimpseError::Caption(_)
            | GlimpseError::Explanation(_)
            | GlimpseError::Http(_) => 502,

            GlimpseError::Timeout { .. } => 504,

            _ => 500,
        }
    }

    /// Errors that must stop a build or keep the process from starting.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GlimpseError::Config(_)
                | GlimpseError::ArtifactUnreadable { .. }
                | GlimpseError::MalformedArtifact { .. }
                | GlimpseError::DimensionMismatch { .. }
                | GlimpseError::LengthMismatch { .. }
                | GlimpseError::SourceUnreadable { .. }
                | GlimpseError::NothingIndexed { .. }
        )
    }

    /// Short machine-readable label, used for metric labels and
    /// per-result error markers.
    pub fn kind(&self) -> &'static str {
        match self {
            GlimpseError::Config(_) => "config",
            GlimpseError::ArtifactUnreadable { .. } => "artifact_unreadable",
            GlimpseError::MalformedArtifact { .. } => "malformed_artifact",
            GlimpseError::DimensionMismatch { .. } => "dimension_mismatch",
            GlimpseError::LengthMismatch { .. } => "length_mismatch",
            GlimpseError::EmptyQuery => "empty_query",
            GlimpseError::InvalidRequest(_) => "invalid_request",
            GlimpseError::Encoder(_) => "encoder",
            GlimpseError::Caption(_) => "caption",
            GlimpseError::Explanation(_) => "explanation",
            GlimpseError::Timeout { .. } => "timeout",
            GlimpseError::BuildItem { .. } => "build_item",
            GlimpseError::SourceUnreadable { .. } => "source_unreadable",
            GlimpseError::NothingIndexed { .. } => "nothing_indexed",
            GlimpseError::Index(_) => "index",
            GlimpseError::Json(_) => "json",
            GlimpseError::Bincode(_) => "bincode",
            GlimpseError::Io(_) => "io",
            GlimpseError::Http(_) => "http",
            GlimpseError::Internal(_) => "internal",
        }
    }
}
