use axum::{
    routing::{get, post},
    Router,
};

use crate::features::listings::handlers::{self, ListingRoute, ListingState};
use crate::features::listings::models::{Business, Provider};

/// Create routes for the listings feature
///
/// Reads are public, submitting and claiming need a signed-in user,
/// everything else requires the admin role.
pub fn routes(state: ListingState) -> Router {
    Router::new()
        .merge(kind_routes::<Business>("/api/businesses"))
        .merge(kind_routes::<Provider>("/api/providers"))
        .with_state(state)
}

fn kind_routes<T: ListingRoute>(base: &str) -> Router<ListingState> {
    Router::new()
        .route(
            base,
            get(handlers::list_listings::<T>).post(handlers::create_listing::<T>),
        )
        .route(
            &format!("{}/featured", base),
            get(handlers::featured_listings::<T>),
        )
        .route(
            &format!("{}/bulk-set-category", base),
            post(handlers::bulk_set_category::<T>),
        )
        .route(
            &format!("{}/bulk-create", base),
            post(handlers::bulk_create::<T>),
        )
        .route(
            &format!("{}/by-slug/{{slug}}", base),
            get(handlers::get_listing_by_slug::<T>),
        )
        .route(
            &format!("{}/by-path/{{*rest}}", base),
            get(handlers::get_listing_by_path::<T>),
        )
        .route(
            &format!("{}/{{id}}", base),
            get(handlers::get_listing::<T>)
                .patch(handlers::update_listing::<T>)
                .delete(handlers::delete_listing::<T>),
        )
        .route(
            &format!("{}/{{id}}/claim", base),
            post(handlers::claim_listing::<T>),
        )
        .route(
            &format!("{}/{{id}}/approve-claim", base),
            post(handlers::approve_claim::<T>),
        )
        .route(
            &format!("{}/{{id}}/reject-claim", base),
            post(handlers::reject_claim::<T>),
        )
        .route(
            &format!("{}/{{id}}/set-owner", base),
            post(handlers::set_owner::<T>),
        )
}
