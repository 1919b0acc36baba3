use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::client::{check_and_parse, transport_error};
use crate::config::ExplainerConfig;
use crate::error::{GlimpseError, Result};

use super::Explainer;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Explains matches with an OpenAI-compatible chat-completions endpoint
/// (Groq by default).
pub struct ChatExplainer {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    http_client: Client,
}

impl ChatExplainer {
    pub fn new(config: &ExplainerConfig, api_key: String, http_client: Client) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout(),
            http_client,
        }
    }

    pub fn prompt(query: &str, caption: &str) -> String {
        format!(
            "Query: {query}\n\
             Image description: {caption}\n\
             Explain in 1-2 sentences why this image matches the query.\n\
             Output format: Plain sentence without numbering and starting with 'matches because'"
        )
    }
}

#[async_trait]
impl Explainer for ChatExplainer {
    async fn generate_explanation(&self, query: &str, caption: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": Self::prompt(query, caption)}],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error(
                "explanation",
                self.timeout.as_millis() as u64,
                GlimpseError::Explanation,
            ))?;

        let body: ChatResponse =
            check_and_parse(response, "explainer", GlimpseError::Explanation).await?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GlimpseError::Explanation("completion had no content".into()))
    }

    fn name(&self) -> &'static str {
        "chat"
    }
}

/// Deterministic local explainer, always available.
pub struct TemplateExplainer;

impl TemplateExplainer {
    pub fn explain(query: &str, caption: &str) -> String {
        format!("This image matches \"{query}\" because: {caption}")
    }
}

#[async_trait]
impl Explainer for TemplateExplainer {
    async fn generate_explanation(&self, query: &str, caption: &str) -> Result<String> {
        Ok(Self::explain(query, caption))
    }

    fn name(&self) -> &'static str {
        "template"
    }
}
