//! Online search: encode the query, rank the collection, join hits to their
//! metadata, and enrich each hit with a caption and an explanation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::collection::IndexedCollection;
use crate::config::Config;
use crate::deadline::with_timeout;
use crate::encoder::Encoder;
use crate::enrich::{captioner_from_config, explainer_from_config, Captioner, Explainer, ImageRef};
use crate::error::{GlimpseError, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::types::{EnrichmentFailure, MetadataRecord, Neighbor, SearchResponse, SearchResult};

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub encode_timeout: Duration,
    pub caption_timeout: Duration,
    pub explain_timeout: Duration,
}

impl SearchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_top_k: config.server.default_top_k,
            max_top_k: config.server.max_top_k,
            encode_timeout: config.encoder.timeout(),
            caption_timeout: config.captioner.timeout(),
            explain_timeout: config.explainer.timeout(),
        }
    }

    /// Clamp a caller-supplied result count to `[1, max_top_k]`.
    pub fn clamp_top_k(&self, requested: Option<i64>) -> usize {
        let max = self.max_top_k.max(1);
        match requested {
            Some(k) if k < 1 => 1,
            Some(k) => usize::try_from(k).unwrap_or(max).min(max),
            None => self.default_top_k.clamp(1, max),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Everything a search request needs, constructed once at startup.
pub struct SearchService<I = FlatIndex> {
    collection: Arc<IndexedCollection<I>>,
    encoder: Arc<dyn Encoder>,
    captioner: Arc<dyn Captioner>,
    explainer: Arc<dyn Explainer>,
    images_dir: PathBuf,
    settings: SearchSettings,
}

impl<I: VectorIndex> SearchService<I> {
    /// # Errors
    /// `GlimpseError::DimensionMismatch` if the encoder and the collection
    /// disagree on dimensionality.
    pub fn new(
        collection: Arc<IndexedCollection<I>>,
        encoder: Arc<dyn Encoder>,
        captioner: Arc<dyn Captioner>,
        explainer: Arc<dyn Explainer>,
        images_dir: PathBuf,
        settings: SearchSettings,
    ) -> Result<Self> {
        if encoder.dimension() != collection.dimension() {
            return Err(GlimpseError::DimensionMismatch {
                expected: collection.dimension(),
                actual: encoder.dimension(),
            });
        }
        Ok(Self {
            collection,
            encoder,
            captioner,
            explainer,
            images_dir,
            settings,
        })
    }

    /// Wire the service from configuration, choosing remote or local
    /// enrichment collaborators.
    pub fn from_config(
        config: &Config,
        collection: Arc<IndexedCollection<I>>,
        encoder: Arc<dyn Encoder>,
        http_client: Client,
    ) -> Result<Self> {
        Self::new(
            collection,
            encoder,
            captioner_from_config(&config.captioner, http_client.clone()),
            explainer_from_config(&config.explainer, http_client),
            config.artifacts.images_dir.clone(),
            SearchSettings::from_config(config),
        )
    }

    pub fn collection(&self) -> &IndexedCollection<I> {
        &self.collection
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    #[instrument(skip_all, fields(top_k = ?top_k))]
    pub async fn search(&self, query: &str, top_k: Option<i64>) -> Result<SearchResponse> {
        let start = Instant::now();
        let result = self.run(query, top_k).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(GlimpseError::EmptyQuery) => "rejected",
            Err(_) => "error",
        };
        crate::metrics::SEARCHES_TOTAL
            .with_label_values(&[outcome])
            .inc();
        crate::metrics::SEARCH_DURATION.observe(start.elapsed().as_secs_f64());

        if let Ok(response) = &result {
            info!(
                results = response.results.len(),
                top_k = response.top_k,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "search complete"
            );
        }
        result
    }

    async fn run(&self, query: &str, top_k: Option<i64>) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            return Err(GlimpseError::EmptyQuery);
        }
        let top_k = self.settings.clamp_top_k(top_k);

        let vector = with_timeout(
            "encode_text",
            self.settings.encode_timeout,
            self.encoder.encode_text(query),
        )
        .await?;

        let neighbors = self.collection.search(&vector, top_k)?;
        debug!(hits = neighbors.len(), "index search complete");

        let hits: Vec<(Neighbor, &MetadataRecord)> = neighbors
            .into_iter()
            .filter_map(|n| match self.collection.record(n.ordinal) {
                Some(record) => Some((n, record)),
                None => {
                    warn!(
                        ordinal = n.ordinal,
                        items = self.collection.len(),
                        "dropping hit without metadata"
                    );
                    crate::metrics::DROPPED_ORDINALS_TOTAL
                        .with_label_values(&["out_of_range"])
                        .inc();
                    None
                }
            })
            .collect();

        // join_all yields in input order, so ranking survives concurrency
        let results = join_all(
            hits.into_iter()
                .map(|(neighbor, record)| self.enrich(query, neighbor, record)),
        )
        .await;

        Ok(SearchResponse {
            query: query.to_string(),
            top_k,
            results,
        })
    }

    async fn enrich(&self, query: &str, neighbor: Neighbor, record: &MetadataRecord) -> SearchResult {
        let filename = record.resolved_filename().to_string();
        let mut result = SearchResult {
            ordinal: neighbor.ordinal,
            distance: neighbor.distance,
            path: format!("/images/{filename}"),
            filename,
            caption: None,
            explanation: None,
            enrichment_error: None,
        };

        let bytes = match tokio::fs::read(self.images_dir.join(&result.filename)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                result.enrichment_error = Some(failure("image", &GlimpseError::Io(e)));
                return result;
            }
        };

        let image = ImageRef {
            filename: &result.filename,
            bytes: &bytes,
        };
        let caption = match with_timeout(
            "caption",
            self.settings.caption_timeout,
            self.captioner.generate_caption(image),
        )
        .await
        {
            Ok(caption) => caption,
            Err(e) => {
                result.enrichment_error = Some(failure("caption", &e));
                return result;
            }
        };

        let explanation = with_timeout(
            "explanation",
            self.settings.explain_timeout,
            self.explainer.generate_explanation(query, &caption),
        )
        .await;
        result.caption = Some(caption);

        match explanation {
            Ok(text) => result.explanation = Some(text),
            Err(e) => result.enrichment_error = Some(failure("explanation", &e)),
        }
        result
    }
}

fn failure(stage: &str, err: &GlimpseError) -> EnrichmentFailure {
    warn!(stage, error = %err, "enrichment failed");
    crate::metrics::ENRICHMENT_FAILURES_TOTAL
        .with_label_values(&[stage, err.kind()])
        .inc();
    EnrichmentFailure {
        stage: stage.to_string(),
        kind: err.kind().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(default_top_k: usize, max_top_k: usize) -> SearchSettings {
        SearchSettings {
            default_top_k,
            max_top_k,
            ..SearchSettings::default()
        }
    }

    #[test]
    fn test_clamp_top_k() {
        let s = settings(5, 10);
        assert_eq!(s.clamp_top_k(None), 5);
        assert_eq!(s.clamp_top_k(Some(0)), 1);
        assert_eq!(s.clamp_top_k(Some(-3)), 1);
        assert_eq!(s.clamp_top_k(Some(7)), 7);
        assert_eq!(s.clamp_top_k(Some(50)), 10);
        assert_eq!(s.clamp_top_k(Some(i64::MAX)), 10);
    }

    #[test]
    fn test_default_top_k_is_clamped_too() {
        assert_eq!(settings(25, 10).clamp_top_k(None), 10);
        assert_eq!(settings(0, 10).clamp_top_k(None), 1);
    }

    #[test]
    fn test_failure_marker() {
        let marker = failure(
            "caption",
            &GlimpseError::Timeout {
                operation: "caption",
                after_ms: 30,
            },
        );
        assert_eq!(marker.stage, "caption");
        assert_eq!(marker.kind, "timeout");
        assert_eq!(marker.message, "caption timed out after 30ms");
    }
}
