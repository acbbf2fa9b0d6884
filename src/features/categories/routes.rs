use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::categories::handlers;
use crate::features::categories::services::CategoryService;

/// Create routes for the categories feature
///
/// Reads are public; writes require the admin role.
pub fn routes(service: Arc<CategoryService>) -> Router {
    Router::new()
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/api/categories/tree", get(handlers::category_tree))
        .route("/api/categories/top", get(handlers::top_categories))
        .route("/api/categories/recalc-counts", post(handlers::recalc_counts))
        .route(
            "/api/categories/by-slug/{slug}",
            get(handlers::get_category_by_slug),
        )
        .route(
            "/api/categories/by-path/{*path}",
            get(handlers::get_category_by_path),
        )
        .route(
            "/api/categories/{id}",
            get(handlers::get_category)
                .patch(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route("/api/categories/{id}/breadcrumb", get(handlers::get_breadcrumb))
        .route(
            "/api/categories/{id}/listing-count",
            get(handlers::get_listing_count),
        )
        .with_state(service)
}
