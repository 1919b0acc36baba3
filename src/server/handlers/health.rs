use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::server::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let collection = state.search.collection();
    Json(json!({
        "status": "ok",
        "items": collection.len(),
        "dimension": collection.dimension(),
    }))
}
