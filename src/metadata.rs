//! Ordered metadata records, positionally aligned with the vector index.

use std::path::Path;

use tracing::{debug, instrument};

use crate::error::{GlimpseError, Result};
use crate::storage;
use crate::types::{MetadataRecord, Ordinal};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    records: Vec<MetadataRecord>,
}

impl MetadataStore {
    pub fn new(records: Vec<MetadataRecord>) -> Self {
        Self { records }
    }

    /// Bounds-checked lookup by ordinal.
    pub fn get(&self, ordinal: Ordinal) -> Option<&MetadataRecord> {
        self.records.get(ordinal)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.records.iter()
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.records)?)
    }

    #[instrument(skip_all, fields(path = %path.display(), count = self.len()))]
    pub fn persist(&self, path: &Path) -> Result<()> {
        storage::write_artifact(path, &self.to_bytes()?)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = storage::read_artifact(path)?;
        let records: Vec<MetadataRecord> =
            serde_json::from_slice(&bytes).map_err(|e| GlimpseError::MalformedArtifact {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if let Some(ordinal) = records.iter().position(|r| r.resolved_filename().is_empty()) {
            return Err(GlimpseError::MalformedArtifact {
                path: path.to_path_buf(),
                reason: format!("record {ordinal} has no filename and no file in its path"),
            });
        }
        debug!(count = records.len(), "loaded metadata");
        Ok(Self { records })
    }
}
