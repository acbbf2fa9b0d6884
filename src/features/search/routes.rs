use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::search::handlers;
use crate::features::search::services::SearchService;

/// Create routes for the search feature (public)
pub fn routes(service: Arc<SearchService>) -> Router {
    Router::new()
        .route("/api/search", get(handlers::search))
        .with_state(service)
}
