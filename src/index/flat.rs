//! Exact brute-force index over squared Euclidean distance.
//!
//! Vectors are stored row-major in one contiguous buffer. Every query scans
//! all rows, so results are always the true top-k.

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{GlimpseError, Result};
use crate::storage;
use crate::types::Neighbor;

use super::distance::squared_euclidean;
use super::traits::VectorIndex;

const MAGIC: [u8; 4] = *b"GLFX";
const FORMAT_VERSION: u32 = 1;

/// On-disk form of a `FlatIndex`.
#[derive(Serialize, Deserialize)]
struct FlatIndexFile {
    magic: [u8; 4],
    version: u32,
    dim: usize,
    count: usize,
    data: Vec<f32>,
    /// xxh3 of the little-endian bytes of `data`.
    checksum: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Vector stored at `ordinal`, if any.
    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        let start = ordinal.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim)
    }

    fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        let malformed = |reason: String| GlimpseError::MalformedArtifact {
            path: path.to_path_buf(),
            reason,
        };

        let file: FlatIndexFile = bincode::deserialize(bytes)
            .map_err(|e| malformed(format!("not a glimpse index: {e}")))?;

        if file.magic != MAGIC {
            return Err(malformed("bad magic bytes".into()));
        }
        if file.version != FORMAT_VERSION {
            return Err(malformed(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                file.version
            )));
        }
        if file.dim == 0 || file.count == 0 {
            return Err(malformed(format!(
                "empty index (dim={}, count={})",
                file.dim, file.count
            )));
        }
        if file.count.checked_mul(file.dim) != Some(file.data.len()) {
            return Err(malformed(format!(
                "shape {}x{} does not match {} stored values",
                file.count,
                file.dim,
                file.data.len()
            )));
        }
        let actual = checksum(&file.data);
        if actual != file.checksum {
            return Err(malformed(format!(
                "checksum mismatch: expected {}, got {actual}",
                file.checksum
            )));
        }

        Ok(Self {
            dim: file.dim,
            data: file.data,
        })
    }
}

fn checksum(data: &[f32]) -> u64 {
    let bytes: Vec<u8> = data.iter().flat_map(|x| x.to_le_bytes()).collect();
    xxh3_64(&bytes)
}

/// Ascending distance, ties broken by ascending ordinal.
fn rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.ordinal.cmp(&b.ordinal))
}

impl VectorIndex for FlatIndex {
    fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dim = match vectors.first() {
            Some(v) if !v.is_empty() => v.len(),
            Some(_) => return Err(GlimpseError::Index("vectors must be non-empty".into())),
            None => return Err(GlimpseError::Index("cannot build an empty index".into())),
        };

        let mut data = Vec::with_capacity(dim * vectors.len());
        for v in &vectors {
            if v.len() != dim {
                return Err(GlimpseError::DimensionMismatch {
                    expected: dim,
                    actual: v.len(),
                });
            }
            data.extend_from_slice(v);
        }

        debug!(count = vectors.len(), dim, "built flat index");
        Ok(Self { dim, data })
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(GlimpseError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let k = k.clamp(1, self.len().max(1));

        let mut candidates: Vec<Neighbor> = self
            .rows()
            .enumerate()
            .map(|(ordinal, row)| Neighbor {
                ordinal,
                distance: squared_euclidean(query, row),
            })
            .collect();

        if k < candidates.len() {
            candidates.select_nth_unstable_by(k - 1, rank);
            candidates.truncate(k);
        }
        candidates.sort_unstable_by(rank);

        Ok(candidates)
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let file = FlatIndexFile {
            magic: MAGIC,
            version: FORMAT_VERSION,
            dim: self.dim,
            count: self.len(),
            data: self.data.clone(),
            checksum: checksum(&self.data),
        };
        Ok(bincode::serialize(&file)?)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn load(path: &Path) -> Result<Self> {
        let bytes = storage::read_artifact(path)?;
        let index = Self::from_bytes(path, &bytes)?;
        debug!(count = index.len(), dim = index.dim, "loaded flat index");
        Ok(index)
    }

    fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}
