use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::client::{check_and_parse, transport_error};
use crate::error::{GlimpseError, Result};

use super::{Captioner, ImageRef};

#[derive(Debug, Deserialize)]
struct CaptionResponse {
    caption: String,
}

/// Captions images through a remote captioning service:
/// `POST {url}/caption` with the raw bytes, answering `{"caption": ".."}`.
pub struct HttpCaptioner {
    base_url: String,
    timeout: Duration,
    http_client: Client,
}

impl HttpCaptioner {
    pub fn new(base_url: &str, timeout: Duration, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            http_client,
        }
    }
}

#[async_trait]
impl Captioner for HttpCaptioner {
    async fn generate_caption(&self, image: ImageRef<'_>) -> Result<String> {
        let response = self
            .http_client
            .post(format!("{}/caption", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .timeout(self.timeout)
            .body(image.bytes.to_vec())
            .send()
            .await
            .map_err(transport_error(
                "caption",
                self.timeout.as_millis() as u64,
                GlimpseError::Caption,
            ))?;

        let body: CaptionResponse =
            check_and_parse(response, "captioner", GlimpseError::Caption).await?;
        let caption = body.caption.trim();
        if caption.is_empty() {
            return Err(GlimpseError::Caption(format!(
                "empty caption for {}",
                image.filename
            )));
        }
        Ok(caption.to_string())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Deterministic local captioner: turns the file stem into words,
/// `red_car-01.jpg` becomes `red car 01`.
pub struct FilenameCaptioner;

impl FilenameCaptioner {
    pub fn caption_for(filename: &str) -> String {
        let stem = match filename.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => filename,
        };
        stem.split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl Captioner for FilenameCaptioner {
    async fn generate_caption(&self, image: ImageRef<'_>) -> Result<String> {
        Ok(Self::caption_for(image.filename))
    }

    fn name(&self) -> &'static str {
        "filename"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_from_filename() {
        assert_eq!(FilenameCaptioner::caption_for("red_car-01.jpg"), "red car 01");
        assert_eq!(FilenameCaptioner::caption_for("dog.png"), "dog");
        assert_eq!(FilenameCaptioner::caption_for(".hidden"), "hidden");
        assert_eq!(FilenameCaptioner::caption_for("no extension"), "no extension");
    }

    #[tokio::test]
    async fn test_filename_captioner_ignores_bytes() {
        let caption = FilenameCaptioner
            .generate_caption(ImageRef {
                filename: "beach_sunset.webp",
                bytes: &[],
            })
            .await
            .unwrap();
        assert_eq!(caption, "beach sunset");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_caption_error() {
        // port 9 (discard) is closed on test hosts
        let captioner = HttpCaptioner::new("http://127.0.0.1:9", Duration::from_secs(2), Client::new());
        let err = captioner
            .generate_caption(ImageRef {
                filename: "a.jpg",
                bytes: b"\xff\xd8\xff",
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GlimpseError::Caption(_) | GlimpseError::Timeout { .. }
        ));
    }
}
