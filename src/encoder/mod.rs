//! Embedding encoders.
//!
//! Both encode paths of one `Encoder` must come from the same model
//! configuration: distances between an image vector and a text vector are
//! only meaningful inside one shared embedding space.

pub mod http;

use async_trait::async_trait;

use crate::error::{GlimpseError, Result};
use crate::index::distance::normalize;

pub use http::HttpEncoder;

/// Maps query text and image bytes into one unit-norm embedding space.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Output dimensionality of both encode paths.
    fn dimension(&self) -> usize;

    async fn encode_text(&self, text: &str) -> Result<Vec<f32>>;

    async fn encode_image(&self, image: &[u8]) -> Result<Vec<f32>>;
}

/// Check the dimension of a raw embedding and scale it to unit length.
pub fn finish_embedding(mut values: Vec<f32>, expected_dim: usize) -> Result<Vec<f32>> {
    if values.len() != expected_dim {
        return Err(GlimpseError::DimensionMismatch {
            expected: expected_dim,
            actual: values.len(),
        });
    }
    if !normalize(&mut values) {
        return Err(GlimpseError::Encoder(
            "embedding is zero or not finite".into(),
        ));
    }
    Ok(values)
}
