pub mod handlers;
pub mod routes;

use std::sync::Arc;

use crate::config::Config;
use crate::search::SearchService;

/// Shared application state injected into all handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub config: Arc<Config>,
}
