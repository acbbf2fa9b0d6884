/// Number of listings returned by the `featured` endpoints
pub const FEATURED_LIMIT: i64 = 8;

/// Number of categories returned by `/api/categories/top`
pub const TOP_CATEGORIES_LIMIT: i64 = 6;

/// Number of reviews returned by `/api/reviews/recent`
pub const RECENT_REVIEWS_LIMIT: i64 = 6;

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Admin role - moderates listings, claims, categories and reviews
pub const ROLE_ADMIN: &str = "admin";
