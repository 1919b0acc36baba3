//! The aligned (vector index, metadata store) pair.
//!
//! Both halves are private and there are no mutators, so once a collection
//! exists its length invariant holds for the rest of its life.

use std::path::Path;

use tracing::{info, instrument};

use crate::error::{GlimpseError, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::metadata::MetadataStore;
use crate::storage;
use crate::types::{MetadataRecord, Neighbor, Ordinal};

#[derive(Debug)]
pub struct IndexedCollection<I = FlatIndex> {
    index: I,
    metadata: MetadataStore,
}

impl<I: VectorIndex> IndexedCollection<I> {
    /// Pair an index with its metadata.
    ///
    /// # Errors
    /// `GlimpseError::LengthMismatch` if the two disagree on item count.
    pub fn new(index: I, metadata: MetadataStore) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(GlimpseError::LengthMismatch {
                vectors: index.len(),
                records: metadata.len(),
            });
        }
        Ok(Self { index, metadata })
    }

    /// Load both artifacts and check that they belong together.
    #[instrument(skip_all, fields(index = %index_path.display(), metadata = %metadata_path.display()))]
    pub fn load(index_path: &Path, metadata_path: &Path) -> Result<Self> {
        let index = I::load(index_path)?;
        let metadata = MetadataStore::load(metadata_path)?;
        let collection = Self::new(index, metadata)?;
        info!(
            items = collection.len(),
            dimension = collection.dimension(),
            "loaded indexed collection"
        );
        Ok(collection)
    }

    /// Write both artifacts, index first.
    ///
    /// Both temp files are fully written before either is renamed, so a
    /// failed write leaves the previous pair untouched.
    #[instrument(skip_all, fields(index = %index_path.display(), metadata = %metadata_path.display(), count = self.len()))]
    pub fn persist(&self, index_path: &Path, metadata_path: &Path) -> Result<()> {
        let index = storage::stage_artifact(index_path, &self.index.to_bytes()?)?;
        let metadata = storage::stage_artifact(metadata_path, &self.metadata.to_bytes()?)?;
        index.commit()?;
        metadata.commit()?;
        info!(items = self.len(), "persisted indexed collection");
        Ok(())
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.index.search(query, k)
    }

    /// Bounds-checked metadata lookup.
    pub fn record(&self, ordinal: Ordinal) -> Option<&MetadataRecord> {
        self.metadata.get(ordinal)
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }
}
