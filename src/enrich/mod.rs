//! Per-hit enrichment collaborators: captions and match explanations.
//!
//! Each has a remote-backed implementation and a deterministic local one;
//! which is active is decided once, from configuration.

pub mod captioner;
pub mod explainer;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::config::{CaptionerConfig, ExplainerConfig};
use crate::error::Result;

pub use captioner::{FilenameCaptioner, HttpCaptioner};
pub use explainer::{ChatExplainer, TemplateExplainer};

/// An image handed to a captioner.
#[derive(Debug, Clone, Copy)]
pub struct ImageRef<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

#[async_trait]
pub trait Captioner: Send + Sync {
    async fn generate_caption(&self, image: ImageRef<'_>) -> Result<String>;

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait Explainer: Send + Sync {
    async fn generate_explanation(&self, query: &str, caption: &str) -> Result<String>;

    fn name(&self) -> &'static str;
}

pub fn captioner_from_config(config: &CaptionerConfig, http_client: Client) -> Arc<dyn Captioner> {
    let captioner: Arc<dyn Captioner> = match &config.url {
        Some(url) => Arc::new(HttpCaptioner::new(url, config.timeout(), http_client)),
        None => Arc::new(FilenameCaptioner),
    };
    info!(captioner = captioner.name(), "caption generator selected");
    captioner
}

pub fn explainer_from_config(config: &ExplainerConfig, http_client: Client) -> Arc<dyn Explainer> {
    let explainer: Arc<dyn Explainer> = match &config.api_key {
        Some(key) => Arc::new(ChatExplainer::new(config, key.clone(), http_client)),
        None => Arc::new(TemplateExplainer),
    };
    info!(explainer = explainer.name(), "explanation generator selected");
    explainer
}
