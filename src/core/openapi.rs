use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth;
use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::listings::{
    dtos as listings_dtos, listing::AnyListing, models as listings_models,
};
use crate::features::reviews::{
    dtos as reviews_dtos, handlers as reviews_handlers, models as reviews_models,
};
use crate::features::search::{dtos as search_dtos, handlers as search_handlers};
use crate::shared::types::{ApiResponse, Meta};

// Listing handlers are generic over the listing kind and mounted under both
// `/api/businesses` and `/api/providers`; only their schemas are listed here.
#[derive(OpenApi)]
#[openapi(
    paths(
        // Categories
        categories_handlers::list_categories,
        categories_handlers::category_tree,
        categories_handlers::top_categories,
        categories_handlers::get_category,
        categories_handlers::get_category_by_slug,
        categories_handlers::get_category_by_path,
        categories_handlers::get_breadcrumb,
        categories_handlers::get_listing_count,
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::delete_category,
        categories_handlers::recalc_counts,
        // Search
        search_handlers::search,
        // Reviews
        reviews_handlers::list_reviews,
        reviews_handlers::recent_reviews,
        reviews_handlers::get_review,
        reviews_handlers::create_review,
        reviews_handlers::update_review,
        reviews_handlers::delete_review,
        reviews_handlers::update_review_status,
        reviews_handlers::reply_to_review,
        reviews_handlers::delete_review_reply,
        reviews_handlers::mark_review_helpful,
        reviews_handlers::flag_review,
        reviews_handlers::list_review_flags,
    ),
    components(
        schemas(
            // Shared
            Meta,
            auth::model::AuthenticatedUser,
            // Categories
            categories_dtos::CategoryResponseDto,
            categories_dtos::CategoryTreeDto,
            categories_dtos::BreadcrumbItem,
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            categories_dtos::RecalcCountsDto,
            categories_dtos::RecalcCountsResponseDto,
            categories_dtos::ListingCountDto,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            ApiResponse<Vec<categories_dtos::CategoryTreeDto>>,
            ApiResponse<Vec<categories_dtos::BreadcrumbItem>>,
            ApiResponse<categories_dtos::ListingCountDto>,
            ApiResponse<categories_dtos::RecalcCountsResponseDto>,
            // Listings
            listings_models::Business,
            listings_models::Provider,
            listings_models::ListingStatus,
            listings_models::ListingKind,
            listings_models::ListingTarget,
            AnyListing,
            listings_dtos::CreateBusinessDto,
            listings_dtos::UpdateBusinessDto,
            listings_dtos::CreateProviderDto,
            listings_dtos::UpdateProviderDto,
            listings_dtos::BusinessOwnerEditDto,
            listings_dtos::ProviderOwnerEditDto,
            listings_dtos::ClaimDto,
            listings_dtos::RejectClaimDto,
            listings_dtos::SetOwnerDto,
            listings_dtos::BulkFilters,
            listings_dtos::BulkSetCategoryDto,
            listings_dtos::BulkSetCategoryResultDto,
            listings_dtos::BulkCreateResultDto,
            ApiResponse<listings_models::Business>,
            ApiResponse<listings_models::Provider>,
            ApiResponse<AnyListing>,
            // Search
            search_dtos::SearchHitDto,
            search_dtos::SearchResultsDto,
            ApiResponse<search_dtos::SearchResultsDto>,
            // Reviews
            reviews_models::ReviewStatus,
            reviews_dtos::ReviewResponseDto,
            reviews_dtos::ReviewFlagResponseDto,
            reviews_dtos::CreateReviewDto,
            reviews_dtos::UpdateReviewDto,
            reviews_dtos::UpdateReviewStatusDto,
            reviews_dtos::ReplyDto,
            reviews_dtos::FlagReviewDto,
            ApiResponse<reviews_dtos::ReviewResponseDto>,
            ApiResponse<Vec<reviews_dtos::ReviewResponseDto>>,
            ApiResponse<Vec<reviews_dtos::ReviewFlagResponseDto>>,
        )
    ),
    tags(
        (name = "categories", description = "Category tree with materialized paths"),
        (name = "businesses", description = "Business listings (lawyer vertical)"),
        (name = "providers", description = "Provider listings (medical vertical)"),
        (name = "search", description = "Blended ranked search across listings"),
        (name = "reviews", description = "Listing reviews and moderation"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Rankify Directory API",
        version = "0.1.0",
        description = "API documentation for the Rankify listing directory",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_directory_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/categories/{id}/breadcrumb"));
        assert!(paths.contains_key("/api/search"));
        assert!(paths.contains_key("/api/reviews/{id}/flag"));
    }

    #[test]
    fn test_info_modifier() {
        let mut doc = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Directory".to_string(),
            version: "9.9.9".to_string(),
            description: "desc".to_string(),
        }
        .modify(&mut doc);
        assert_eq!(doc.info.title, "Directory");
        assert_eq!(doc.info.description.as_deref(), Some("desc"));
    }
}
