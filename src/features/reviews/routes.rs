use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::features::reviews::handlers;
use crate::features::reviews::services::ReviewService;

/// Create routes for the reviews feature
pub fn routes(service: Arc<ReviewService>) -> Router {
    Router::new()
        .route(
            "/api/reviews",
            get(handlers::list_reviews).post(handlers::create_review),
        )
        .route("/api/reviews/recent", get(handlers::recent_reviews))
        .route(
            "/api/reviews/{id}",
            get(handlers::get_review)
                .patch(handlers::update_review)
                .delete(handlers::delete_review),
        )
        .route(
            "/api/reviews/{id}/status",
            patch(handlers::update_review_status),
        )
        .route(
            "/api/reviews/{id}/reply",
            post(handlers::reply_to_review).delete(handlers::delete_review_reply),
        )
        .route(
            "/api/reviews/{id}/helpful",
            post(handlers::mark_review_helpful),
        )
        .route("/api/reviews/{id}/flag", post(handlers::flag_review))
        .route("/api/reviews/{id}/flags", get(handlers::list_review_flags))
        .with_state(service)
}
