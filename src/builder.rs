//! Offline index builder.
//!
//! Scans a directory of images, encodes each one, and persists the vector
//! index and the metadata store from one shared accumulator. A bad file is
//! recorded and skipped; only an unreadable directory or an empty result
//! fails the build.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::collection::IndexedCollection;
use crate::config::Config;
use crate::deadline::with_timeout;
use crate::encoder::Encoder;
use crate::error::{GlimpseError, Result};
use crate::image_format::ImageFormat;
use crate::index::{FlatIndex, VectorIndex};
use crate::metadata::MetadataStore;
use crate::types::{BuildReport, MetadataRecord, SkippedItem};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub source_dir: PathBuf,
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
    /// Cap on the number of eligible files, applied before encoding.
    /// `Some(0)` means no cap.
    pub limit: Option<usize>,
    /// Lowercase extensions, without the dot.
    pub extensions: Vec<String>,
    pub progress_every: usize,
    pub encode_timeout: Duration,
}

impl BuildOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_dir: config.artifacts.images_dir.clone(),
            index_path: config.artifacts.index_file.clone(),
            metadata_path: config.artifacts.metadata_file.clone(),
            limit: config.indexing.limit,
            extensions: config
                .indexing
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            progress_every: config.indexing.progress_every,
            encode_timeout: config.encoder.timeout(),
        }
    }
}

/// Successfully encoded items and the items that were skipped, kept in
/// lockstep so ordinal `i` of `vectors` always describes `records[i]`.
#[derive(Default)]
struct Accumulator {
    vectors: Vec<Vec<f32>>,
    records: Vec<MetadataRecord>,
    skipped: Vec<SkippedItem>,
}

impl Accumulator {
    fn accept(&mut self, vector: Vec<f32>, record: MetadataRecord) {
        self.vectors.push(vector);
        self.records.push(record);
    }

    fn skip(&mut self, filename: String, reason: String) {
        self.skipped.push(SkippedItem { filename, reason });
    }
}

pub struct IndexBuilder {
    encoder: Arc<dyn Encoder>,
    options: BuildOptions,
}

impl IndexBuilder {
    pub fn new(encoder: Arc<dyn Encoder>, options: BuildOptions) -> Self {
        Self { encoder, options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Eligible files in directory-listing order, capped at a non-zero `limit`.
    /// This order becomes the ordinal order of the index.
    pub async fn list_images(&self) -> Result<Vec<String>> {
        let dir = &self.options.source_dir;
        let unreadable = |source| GlimpseError::SourceUnreadable {
            path: dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(name = ?raw, "skipping non-UTF-8 file name");
                    continue;
                }
            };
            if !self.has_image_extension(&name) {
                continue;
            }
            // follow symlinks; directories named like images are not images
            match tokio::fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_file() => files.push(name),
                Ok(_) => {}
                Err(e) => warn!(file = %name, error = %e, "cannot stat file, skipping"),
            }
        }

        if let Some(limit) = self.options.limit.filter(|&n| n > 0) {
            files.truncate(limit);
        }
        Ok(files)
    }

    fn has_image_extension(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let ext = ext.to_ascii_lowercase();
                self.options.extensions.iter().any(|e| *e == ext)
            }
            _ => false,
        }
    }

    /// Read, sniff and encode one file.
    async fn encode_item(&self, filename: &str) -> Result<(Vec<f32>, MetadataRecord)> {
        let item_err = |reason: String| GlimpseError::BuildItem {
            filename: filename.to_string(),
            reason,
        };

        let path = self.options.source_dir.join(filename);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| item_err(format!("read failed: {e}")))?;

        let format = ImageFormat::sniff(&bytes)
            .ok_or_else(|| item_err("not a recognized image (bad magic bytes)".into()))?;

        let vector = with_timeout(
            "encode_image",
            self.options.encode_timeout,
            self.encoder.encode_image(&bytes),
        )
        .await
        .map_err(|e| item_err(e.to_string()))?;

        let expected = self.encoder.dimension();
        if vector.len() != expected {
            return Err(item_err(format!(
                "encoder returned {} dimensions, expected {expected}",
                vector.len()
            )));
        }

        debug!(file = %filename, %format, "encoded image");
        Ok((
            vector,
            MetadataRecord {
                filename: filename.to_string(),
                path: display_path(&path),
            },
        ))
    }

    /// Run the whole build and persist both artifacts.
    #[instrument(skip_all, fields(source = %self.options.source_dir.display()))]
    pub async fn build(&self) -> Result<(IndexedCollection, BuildReport)> {
        let started_at = Utc::now();
        let files = self.list_images().await?;
        let total = files.len();
        info!(total, "found images to process");

        let mut acc = Accumulator::default();
        for (idx, filename) in files.into_iter().enumerate() {
            match self.encode_item(&filename).await {
                Ok((vector, record)) => {
                    acc.accept(vector, record);
                    crate::metrics::BUILD_ITEMS_TOTAL
                        .with_label_values(&["indexed"])
                        .inc();
                }
                Err(e) => {
                    warn!(file = %filename, error = %e, "skipping image");
                    crate::metrics::BUILD_ITEMS_TOTAL
                        .with_label_values(&["skipped"])
                        .inc();
                    let reason = match e {
                        GlimpseError::BuildItem { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    acc.skip(filename, reason);
                }
            }

            let done = idx + 1;
            if self.options.progress_every > 0 && done % self.options.progress_every == 0 {
                info!(done, total, "processed images");
            }
        }

        if acc.vectors.is_empty() {
            return Err(GlimpseError::NothingIndexed {
                dir: self.options.source_dir.clone(),
                skipped: acc.skipped.len(),
            });
        }

        let Accumulator {
            vectors,
            records,
            skipped,
        } = acc;

        let index = FlatIndex::build(vectors)?;
        let collection = IndexedCollection::new(index, MetadataStore::new(records))?;

        let index_path = self.options.index_path.clone();
        let metadata_path = self.options.metadata_path.clone();
        let collection = tokio::task::spawn_blocking(move || {
            collection
                .persist(&index_path, &metadata_path)
                .map(|_| collection)
        })
        .await
        .map_err(|e| GlimpseError::Internal(format!("persist task failed: {e}")))??;

        let report = BuildReport {
            indexed: collection.len(),
            skipped,
            dimension: collection.dimension(),
            index_path: self.options.index_path.clone(),
            metadata_path: self.options.metadata_path.clone(),
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            indexed = report.indexed,
            skipped = report.skipped.len(),
            dimension = report.dimension,
            index = %report.index_path.display(),
            metadata = %report.metadata_path.display(),
            "saved index and metadata"
        );

        Ok((collection, report))
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
