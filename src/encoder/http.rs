//! Encoder backed by a remote embedding service.
//!
//! Protocol:
//! - `POST {url}/encode/text` with `{"model": .., "text": ..}`
//! - `POST {url}/encode/image?model=..` with the raw image bytes
//!
//! Both answer `{"embedding": [f32, ..]}`. Vectors are re-normalized and
//! checked against the configured dimension on arrival.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::{check_and_parse, transport_error};
use crate::config::EncoderConfig;
use crate::error::{GlimpseError, Result};

use super::{finish_embedding, Encoder};

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

pub struct HttpEncoder {
    base_url: String,
    model: String,
    dimension: usize,
    timeout: Duration,
    http_client: Client,
}

impl HttpEncoder {
    pub fn new(config: &EncoderConfig, http_client: Client) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            timeout: config.timeout(),
            http_client,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, request: reqwest::RequestBuilder, operation: &'static str) -> Result<Vec<f32>> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error(
                operation,
                self.timeout.as_millis() as u64,
                GlimpseError::Encoder,
            ))?;

        let body: EmbeddingResponse =
            check_and_parse(response, "encoder", GlimpseError::Encoder).await?;
        finish_embedding(body.embedding, self.dimension)
    }
}

#[async_trait]
impl Encoder for HttpEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[instrument(skip_all, fields(chars = text.len()))]
    async fn encode_text(&self, text: &str) -> Result<Vec<f32>> {
        let request = self
            .http_client
            .post(format!("{}/encode/text", self.base_url))
            .json(&serde_json::json!({
                "model": self.model,
                "text": text,
            }));
        let embedding = self.send(request, "encode_text").await?;
        debug!(dim = embedding.len(), "encoded text");
        Ok(embedding)
    }

    #[instrument(skip_all, fields(bytes = image.len()))]
    async fn encode_image(&self, image: &[u8]) -> Result<Vec<f32>> {
        let request = self
            .http_client
            .post(format!("{}/encode/image", self.base_url))
            .query(&[("model", self.model.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec());
        let embedding = self.send(request, "encode_image").await?;
        debug!(dim = embedding.len(), "encoded image");
        Ok(embedding)
    }
}
