#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use glimpse::builder::{BuildOptions, IndexBuilder};
use glimpse::collection::IndexedCollection;
use glimpse::encoder::Encoder;
use glimpse::enrich::{Captioner, Explainer, ImageRef, TemplateExplainer};
use glimpse::error::{GlimpseError, Result};
use glimpse::search::{SearchService, SearchSettings};

use super::vectors::{keyed_vector, unit};

pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Bytes that pass the magic-byte sniff and carry a key the fixture encoder
/// maps to a vector.
pub fn fake_png(key: &str) -> Vec<u8> {
    let mut bytes = PNG_MAGIC.to_vec();
    bytes.extend_from_slice(key.as_bytes());
    bytes
}

fn key_of(bytes: &[u8]) -> Option<&str> {
    bytes
        .strip_prefix(PNG_MAGIC)
        .and_then(|rest| std::str::from_utf8(rest).ok())
}

/// Deterministic encoder: known keys map to fixed vectors, anything else to
/// a hash-derived unit vector. Keys starting with `fail` return an error.
pub struct FixtureEncoder {
    dim: usize,
    images: HashMap<String, Vec<f32>>,
    texts: HashMap<String, Vec<f32>>,
    delay: Option<Duration>,
    pub text_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
}

impl FixtureEncoder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            images: HashMap::new(),
            texts: HashMap::new(),
            delay: None,
            text_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_image(mut self, key: &str, v: &[f32]) -> Self {
        self.images.insert(key.to_string(), unit(v));
        self
    }

    pub fn with_text(mut self, text: &str, v: &[f32]) -> Self {
        self.texts.insert(text.to_string(), unit(v));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn image_vector(&self, key: &str) -> Vec<f32> {
        self.images
            .get(key)
            .cloned()
            .unwrap_or_else(|| keyed_vector(key, self.dim))
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Encoder for FixtureEncoder {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn encode_text(&self, text: &str) -> Result<Vec<f32>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self
            .texts
            .get(text)
            .cloned()
            .unwrap_or_else(|| keyed_vector(text, self.dim)))
    }

    async fn encode_image(&self, image: &[u8]) -> Result<Vec<f32>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let key = key_of(image).ok_or_else(|| GlimpseError::Encoder("undecodable image".into()))?;
        if key.starts_with("fail") {
            return Err(GlimpseError::Encoder(format!("model rejected {key}")));
        }
        Ok(self.image_vector(key))
    }
}

/// Captions `a photo of <stem>`; fails for files whose name contains
/// `nocaption`, sleeps for files whose name contains `slow`.
pub struct FixtureCaptioner;

#[async_trait]
impl Captioner for FixtureCaptioner {
    async fn generate_caption(&self, image: ImageRef<'_>) -> Result<String> {
        if image.filename.contains("nocaption") {
            return Err(GlimpseError::Caption("captioning model unavailable".into()));
        }
        if image.filename.contains("slow") {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        let stem = image.filename.split('.').next().unwrap_or(image.filename);
        Ok(format!("a photo of {stem}"))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

/// Always fails, to exercise the explanation failure marker.
pub struct FailingExplainer;

#[async_trait]
impl Explainer for FailingExplainer {
    async fn generate_explanation(&self, _query: &str, _caption: &str) -> Result<String> {
        Err(GlimpseError::Explanation("completion service returned 503".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// A temporary image directory plus artifact paths.
pub struct Workspace {
    pub dir: TempDir,
    pub images_dir: PathBuf,
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let images_dir = dir.path().join("images");
        std::fs::create_dir_all(&images_dir).unwrap();
        Self {
            index_path: dir.path().join("out/image_index.bin"),
            metadata_path: dir.path().join("out/metadata.json"),
            images_dir,
            dir,
        }
    }

    /// Write an image whose content maps to `key` in the fixture encoder.
    pub fn add_image(&self, filename: &str, key: &str) -> &Self {
        std::fs::write(self.images_dir.join(filename), fake_png(key)).unwrap();
        self
    }

    pub fn add_raw(&self, filename: &str, bytes: &[u8]) -> &Self {
        std::fs::write(self.images_dir.join(filename), bytes).unwrap();
        self
    }

    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            source_dir: self.images_dir.clone(),
            index_path: self.index_path.clone(),
            metadata_path: self.metadata_path.clone(),
            limit: None,
            extensions: ["png", "jpg", "jpeg", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            progress_every: 5,
            encode_timeout: Duration::from_secs(2),
        }
    }

    pub async fn build(&self, encoder: Arc<FixtureEncoder>) -> IndexedCollection {
        let (collection, _report) = IndexBuilder::new(encoder, self.options())
            .build()
            .await
            .expect("build failed");
        collection
    }

    pub fn load(&self) -> Result<IndexedCollection> {
        IndexedCollection::load(&self.index_path, &self.metadata_path)
    }

    pub fn service(
        &self,
        collection: IndexedCollection,
        encoder: Arc<FixtureEncoder>,
        explainer: Arc<dyn Explainer>,
    ) -> SearchService {
        SearchService::new(
            Arc::new(collection),
            encoder,
            Arc::new(FixtureCaptioner),
            explainer,
            self.images_dir.clone(),
            test_settings(),
        )
        .expect("service construction failed")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

pub fn test_settings() -> SearchSettings {
    SearchSettings {
        default_top_k: 5,
        max_top_k: 10,
        encode_timeout: Duration::from_secs(2),
        caption_timeout: Duration::from_millis(200),
        explain_timeout: Duration::from_secs(2),
    }
}

pub fn template_explainer() -> Arc<dyn Explainer> {
    Arc::new(TemplateExplainer)
}

/// The three-image collection: cat, dog, car along separate axes.
pub async fn pets_and_car(ws: &Workspace) -> (IndexedCollection, Arc<FixtureEncoder>) {
    ws.add_image("cat.jpg", "cat")
        .add_image("dog.jpg", "dog")
        .add_image("car.jpg", "car");
    let encoder = Arc::new(
        FixtureEncoder::new(4)
            .with_image("cat", &[1.0, 0.0, 0.0, 0.0])
            .with_image("dog", &[0.0, 1.0, 0.0, 0.0])
            .with_image("car", &[0.0, 0.0, 1.0, 0.0])
            .with_text("a puppy", &[0.2, 0.9, 0.1, 0.0])
            .with_text("a red car", &[0.0, 0.1, 0.9, 0.2]),
    );
    let collection = ws.build(encoder.clone()).await;
    (collection, encoder)
}
