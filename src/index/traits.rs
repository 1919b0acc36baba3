//! Core trait definition for vector index implementations.
//!
//! The collection and the search service are written against `VectorIndex`
//! so the exact flat scan can be swapped for another exact structure without
//! touching them.

use std::path::Path;

use crate::error::Result;
use crate::storage;
use crate::types::Neighbor;

/// Trait that all glimpse index implementations must satisfy.
pub trait VectorIndex: Send + Sync {
    /// Build the index from the full set of vectors, in ordinal order.
    ///
    /// # Errors
    /// Returns `GlimpseError::Index` for an empty input and
    /// `GlimpseError::DimensionMismatch` if any vector's length differs from
    /// the first one's.
    fn build(vectors: Vec<Vec<f32>>) -> Result<Self>
    where
        Self: Sized;

    /// Return the `k` nearest vectors to `query` by ascending squared
    /// Euclidean distance. `k` is clamped to `[1, len]`.
    ///
    /// # Errors
    /// Returns `GlimpseError::DimensionMismatch` if the query dimension does
    /// not match the index.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Serialize the index into its on-disk form.
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Serialize the index to `path`, replacing any previous file atomically.
    fn persist(&self, path: &Path) -> Result<()> {
        storage::write_artifact(path, &self.to_bytes()?)
    }

    /// Load an index previously written by `persist`.
    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Return the total number of vectors in this index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the dimensionality of vectors in this index.
    fn dimension(&self) -> usize;
}
