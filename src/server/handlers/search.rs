use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use crate::error::GlimpseError;
use crate::server::AppState;
use crate::types::SearchResponse;

use super::ApiError;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Clamped server-side; absent means the configured default.
    #[serde(default)]
    pub top_k: Option<i64>,
}

#[instrument(skip_all)]
pub async fn search_images(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(req) =
        payload.map_err(|rejection| GlimpseError::InvalidRequest(rejection.body_text()))?;
    let response = state.search.search(&req.query, req.top_k).await?;
    Ok(Json(response))
}
