use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::core::extractor::AppQuery;
use crate::features::search::dtos::{SearchQuery, SearchResultsDto};
use crate::features::search::services::SearchService;
use crate::shared::types::ApiResponse;

/// Blended search across businesses and providers
///
/// With `q`, each kind is scored and ordered by relevance; without it, by
/// premium flag, rating and recency.
#[utoipa::path(
    get,
    path = "/api/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Ranked page of listings", body = ApiResponse<SearchResultsDto>),
        (status = 400, description = "Invalid filter or pagination value"),
        (status = 503, description = "Search timed out; retry later")
    ),
    tag = "search"
)]
pub async fn search(
    State(service): State<Arc<SearchService>>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResultsDto>>> {
    let results = service.search(&query).await?;
    Ok(Json(ApiResponse::success(Some(results), None, None)))
}
