use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GlimpseError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub captioner: CaptionerConfig,
    #[serde(default)]
    pub explainer: ExplainerConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Result count used when a request does not ask for one.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    /// Upper bound every requested `top_k` is clamped to.
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
    #[serde(default = "default_metadata_file")]
    pub metadata_file: PathBuf,
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Base URL of the embedding service serving both encode paths.
    #[serde(default = "default_encoder_url")]
    pub url: String,
    /// Model name, sent with every request so both paths share one model.
    #[serde(default = "default_encoder_model")]
    pub model: String,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_encoder_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionerConfig {
    /// Caption service base URL. Unset selects the local filename captioner.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_enrich_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainerConfig {
    /// API key for the chat-completions service. Unset selects the local
    /// template explainer.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_explainer_base_url")]
    pub base_url: String,
    #[serde(default = "default_explainer_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_enrich_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Lowercase file extensions eligible for indexing.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Maximum number of files to encode; `None` indexes everything.
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_top_k() -> usize {
    5
}
fn default_max_top_k() -> usize {
    10
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_max_body_bytes() -> usize {
    64 * 1024
}
fn default_index_file() -> PathBuf {
    PathBuf::from("./data/image_index.bin")
}
fn default_metadata_file() -> PathBuf {
    PathBuf::from("./data/metadata.json")
}
fn default_images_dir() -> PathBuf {
    PathBuf::from("./data/images")
}
fn default_encoder_url() -> String {
    "http://127.0.0.1:51000".to_string()
}
fn default_encoder_model() -> String {
    "ViT-B/32".to_string()
}
fn default_dimension() -> usize {
    512
}
fn default_encoder_timeout_ms() -> u64 {
    10_000
}
fn default_enrich_timeout_ms() -> u64 {
    30_000
}
fn default_explainer_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_explainer_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_max_tokens() -> u32 {
    512
}
fn default_temperature() -> f32 {
    0.2
}
fn default_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_progress_every() -> usize {
    50
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            request_timeout_secs: default_request_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            index_file: default_index_file(),
            metadata_file: default_metadata_file(),
            images_dir: default_images_dir(),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            url: default_encoder_url(),
            model: default_encoder_model(),
            dimension: default_dimension(),
            timeout_ms: default_encoder_timeout_ms(),
        }
    }
}

impl Default for CaptionerConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: default_enrich_timeout_ms(),
        }
    }
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_explainer_base_url(),
            model: default_explainer_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_enrich_timeout_ms(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            limit: None,
            progress_every: default_progress_every(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl EncoderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CaptionerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ExplainerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration: TOML file (explicit path, else `GLIMPSE_CONFIG`),
    /// then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("GLIMPSE_CONFIG").map(PathBuf::from));

        let mut config = match file {
            Some(p) => {
                let contents = std::fs::read_to_string(&p).map_err(|e| {
                    GlimpseError::Config(format!("cannot read {}: {e}", p.display()))
                })?;
                Self::from_toml(&contents)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| GlimpseError::Config(e.to_string()))
    }

    /// Apply overrides from a variable lookup. Takes a closure so tests do
    /// not have to mutate the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GLIMPSE_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("GLIMPSE_PORT") {
            self.server.port = parse_var("GLIMPSE_PORT", &v)?;
        }
        if let Some(v) = lookup("TOP_K_DEFAULT") {
            self.server.default_top_k = parse_var("TOP_K_DEFAULT", &v)?;
        }
        if let Some(v) = lookup("GLIMPSE_MAX_TOP_K") {
            self.server.max_top_k = parse_var("GLIMPSE_MAX_TOP_K", &v)?;
        }

        if let Some(v) = lookup("INDEX_FILE") {
            self.artifacts.index_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("META_FILE") {
            self.artifacts.metadata_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("IMAGES_DIR") {
            self.artifacts.images_dir = PathBuf::from(v);
        }

        if let Some(v) = lookup("GLIMPSE_ENCODER_URL") {
            self.encoder.url = v;
        }
        if let Some(v) = lookup("GLIMPSE_ENCODER_MODEL") {
            self.encoder.model = v;
        }
        if let Some(v) = lookup("GLIMPSE_EMBEDDING_DIM") {
            self.encoder.dimension = parse_var("GLIMPSE_EMBEDDING_DIM", &v)?;
        }

        if let Some(v) = lookup("GLIMPSE_CAPTIONER_URL") {
            self.captioner.url = Some(v).filter(|s| !s.is_empty());
        }

        if let Some(v) = lookup("GROQ_API_KEY") {
            self.explainer.api_key = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = lookup("GROQ_MODEL") {
            self.explainer.model = v;
        }
        if let Some(v) = lookup("GROQ_MAX_TOKENS") {
            self.explainer.max_tokens = parse_var("GROQ_MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("GLIMPSE_EXPLAINER_URL") {
            self.explainer.base_url = v;
        }

        if let Some(v) = lookup("GLIMPSE_INDEX_LIMIT") {
            self.indexing.limit = Some(parse_var("GLIMPSE_INDEX_LIMIT", &v)?);
        }

        if let Some(v) = lookup("GLIMPSE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("GLIMPSE_LOG_FORMAT") {
            self.logging.format = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.max_top_k == 0 {
            return Err(GlimpseError::Config("server.max_top_k must be >= 1".into()));
        }
        if self.encoder.dimension == 0 {
            return Err(GlimpseError::Config("encoder.dimension must be >= 1".into()));
        }
        if self.indexing.extensions.is_empty() {
            return Err(GlimpseError::Config(
                "indexing.extensions must not be empty".into(),
            ));
        }
        check_url("encoder.url", &self.encoder.url)?;
        if let Some(url) = &self.captioner.url {
            check_url("captioner.url", url)?;
        }
        check_url("explainer.base_url", &self.explainer.base_url)?;
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| GlimpseError::Config(format!("{key}={value:?}: {e}")))
}

fn check_url(field: &str, value: &str) -> Result<()> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| GlimpseError::Config(format!("{field} {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.default_top_k, 5);
        assert_eq!(config.server.max_top_k, 10);
        assert_eq!(config.encoder.dimension, 512);
        assert_eq!(config.indexing.extensions, vec!["png", "jpg", "jpeg", "webp"]);
        assert!(config.explainer.api_key.is_none());
        assert!(config.captioner.url.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 9000

            [artifacts]
            images_dir = "/srv/images"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.max_top_k, 10);
        assert_eq!(config.artifacts.images_dir, PathBuf::from("/srv/images"));
        assert_eq!(config.artifacts.metadata_file, default_metadata_file());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_overrides(lookup(&[
                ("INDEX_FILE", "/tmp/i.bin"),
                ("META_FILE", "/tmp/m.json"),
                ("TOP_K_DEFAULT", "3"),
                ("GROQ_API_KEY", "gsk_test"),
                ("GROQ_MAX_TOKENS", "128"),
                ("GLIMPSE_CAPTIONER_URL", ""),
            ]))
            .unwrap();
        assert_eq!(config.artifacts.index_file, PathBuf::from("/tmp/i.bin"));
        assert_eq!(config.artifacts.metadata_file, PathBuf::from("/tmp/m.json"));
        assert_eq!(config.server.default_top_k, 3);
        assert_eq!(config.explainer.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.explainer.max_tokens, 128);
        assert!(config.captioner.url.is_none());
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_env_overrides(lookup(&[("TOP_K_DEFAULT", "five")]))
            .unwrap_err();
        assert!(matches!(err, GlimpseError::Config(msg) if msg.contains("TOP_K_DEFAULT")));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.server.max_top_k = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.encoder.url = "not a url".into();
        assert!(config.validate().is_err());
    }
}
