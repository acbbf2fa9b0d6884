use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::features::listings::listing::AnyListing;
use crate::features::listings::models::ListingStatus;
use crate::shared::types::flag_option;

/// Query parameters for blended search across businesses and providers
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Free text; blank means "no text filter, no scoring"
    pub q: Option<String>,
    pub status: Option<ListingStatus>,
    pub category_id: Option<i64>,
    /// Prefix of the category's full path, e.g. `Lawyers/Family`
    pub category_path: Option<String>,
    /// Case-insensitive substring
    pub city: Option<String>,
    /// Case-insensitive exact
    pub state: Option<String>,
    /// `true` restricts to premium listings
    #[serde(default, deserialize_with = "flag_option")]
    pub is_premium: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One blended result: `type`/`data` tag the listing, `rank` is its relevance score
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchHitDto {
    pub rank: i32,
    /// Rules that contributed to `rank`
    pub matched: Vec<&'static str>,
    pub category_name: Option<String>,
    pub category_full_slug: Option<String>,
    #[serde(flatten)]
    pub listing: AnyListing,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchResultsDto {
    pub items: Vec<SearchHitDto>,
    pub limit: i64,
    pub offset: i64,
}
