//! Shared plumbing for the HTTP-backed collaborators.

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::error::{GlimpseError, Result};

/// Constructor for the error variant a collaborator reports failures as.
pub type ErrorKind = fn(String) -> GlimpseError;

pub fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("glimpse/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Check the status of a collaborator response and decode its JSON body.
pub async fn check_and_parse<T: DeserializeOwned>(
    response: Response,
    service: &str,
    err: ErrorKind,
) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        let code = status.as_u16();
        let context = match code {
            401 => "authentication failed".to_string(),
            429 => "rate limit exceeded".to_string(),
            500..=599 => format!("server error ({code})"),
            _ => format!("request failed ({code})"),
        };
        return Err(err(format!("{service} {context}: {}", truncate(&body, 256))));
    }

    response
        .json()
        .await
        .map_err(|e| err(format!("{service} response parse failed: {e}")))
}

/// Map a transport error, keeping timeouts distinct.
pub fn transport_error(
    operation: &'static str,
    timeout_ms: u64,
    err: ErrorKind,
) -> impl Fn(reqwest::Error) -> GlimpseError {
    move |e| {
        if e.is_timeout() {
            GlimpseError::Timeout {
                operation,
                after_ms: timeout_ms,
            }
        } else {
            err(format!("{operation} request failed: {e}"))
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
