use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::RequireAdmin;
use crate::features::categories::dtos::{
    BreadcrumbItem, CategoryResponseDto, CategoryTreeDto, CreateCategoryDto, ListCategoriesQuery,
    ListingCountDto, RecalcCountsDto, RecalcCountsResponseDto, UpdateCategoryDto,
};
use crate::features::categories::services::CategoryService;
use crate::shared::types::{ApiResponse, Meta};

/// List all categories
///
/// Returns categories as flat list (ordered by path) or tree structure based on `tree` query param.
#[utoipa::path(
    get,
    path = "/api/categories",
    params(ListCategoriesQuery),
    responses(
        (status = 200, description = "List of categories", body = ApiResponse<Vec<CategoryResponseDto>>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(service): State<Arc<CategoryService>>,
    AppQuery(query): AppQuery<ListCategoriesQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    let value = if query.tree {
        serde_json::to_value(service.tree().await?)
    } else {
        let categories: Vec<CategoryResponseDto> =
            service.list().await?.into_iter().map(Into::into).collect();
        serde_json::to_value(categories)
    }
    .map_err(|e| AppError::Internal(format!("Failed to serialize categories: {}", e)))?;

    Ok(Json(ApiResponse::success(Some(value), None, None)))
}

/// Category tree
#[utoipa::path(
    get,
    path = "/api/categories/tree",
    responses(
        (status = 200, description = "Nested category tree", body = ApiResponse<Vec<CategoryTreeDto>>),
    ),
    tag = "categories"
)]
pub async fn category_tree(
    State(service): State<Arc<CategoryService>>,
) -> Result<Json<ApiResponse<Vec<CategoryTreeDto>>>> {
    let tree = service.tree().await?;
    Ok(Json(ApiResponse::success(Some(tree), None, None)))
}

/// Top categories by active listing count
#[utoipa::path(
    get,
    path = "/api/categories/top",
    responses(
        (status = 200, description = "Top categories", body = ApiResponse<Vec<CategoryResponseDto>>),
    ),
    tag = "categories"
)]
pub async fn top_categories(
    State(service): State<Arc<CategoryService>>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let categories = service.top().await?.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(Some(categories), None, None)))
}

/// Get category by id
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.get(id).await?;
    let breadcrumb = service.breadcrumb(id).await?;
    let dto = CategoryResponseDto::from(category).with_breadcrumb(breadcrumb);
    Ok(Json(ApiResponse::success(Some(dto), None, None)))
}

/// Get category by sibling slug
#[utoipa::path(
    get,
    path = "/api/categories/by-slug/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category_by_slug(
    State(service): State<Arc<CategoryService>>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.get_by_slug(&slug).await?;
    let breadcrumb = service.breadcrumb(category.id).await?;
    let dto = CategoryResponseDto::from(category).with_breadcrumb(breadcrumb);
    Ok(Json(ApiResponse::success(Some(dto), None, None)))
}

/// Get category by full path, e.g. `Lawyers/Personal_Injury_Lawyers`
#[utoipa::path(
    get,
    path = "/api/categories/by-path/{path}",
    params(("path" = String, Path, description = "Full category path")),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category_by_path(
    State(service): State<Arc<CategoryService>>,
    Path(path): Path<String>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.get_by_path(&path).await?;
    let breadcrumb = service.breadcrumb(category.id).await?;
    let dto = CategoryResponseDto::from(category).with_breadcrumb(breadcrumb);
    Ok(Json(ApiResponse::success(Some(dto), None, None)))
}

/// Root-to-node breadcrumb
#[utoipa::path(
    get,
    path = "/api/categories/{id}/breadcrumb",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Breadcrumb", body = ApiResponse<Vec<BreadcrumbItem>>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_breadcrumb(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<BreadcrumbItem>>>> {
    let breadcrumb = service.breadcrumb(id).await?;
    let total = breadcrumb.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(breadcrumb),
        None,
        Some(Meta { total }),
    )))
}

/// Live count of active listings directly in the category
#[utoipa::path(
    get,
    path = "/api/categories/{id}/listing-count",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Active listing count", body = ApiResponse<ListingCountDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_listing_count(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ListingCountDto>>> {
    let count = service.listing_count(id).await?;
    Ok(Json(ApiResponse::success(
        Some(ListingCountDto {
            category_id: id,
            count,
        }),
        None,
        None,
    )))
}

/// Create a category (admin)
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryDto,
    responses(
        (status = 200, description = "Category created", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin access required")
    ),
    tag = "categories",
    security(("bearer_auth" = []))
)]
pub async fn create_category(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<CategoryService>>,
    AppJson(dto): AppJson<CreateCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    dto.validate()?;

    let category = service.create(dto).await?;
    Ok(Json(ApiResponse::success(
        Some(category.into()),
        Some("Category created successfully".to_string()),
        None,
    )))
}

/// Rename, reparent or edit a category (admin); descendant paths follow
#[utoipa::path(
    patch,
    path = "/api/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    request_body = UpdateCategoryDto,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error or cycle"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories",
    security(("bearer_auth" = []))
)]
pub async fn update_category(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    dto.validate()?;

    let category = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(category.into()),
        Some("Category updated successfully".to_string()),
        None,
    )))
}

/// Delete a leaf category (admin)
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still has subcategories")
    ),
    tag = "categories",
    security(("bearer_auth" = []))
)]
pub async fn delete_category(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Category deleted successfully".to_string()),
        None,
    )))
}

/// Recompute stored listing counts (admin)
#[utoipa::path(
    post,
    path = "/api/categories/recalc-counts",
    request_body = RecalcCountsDto,
    responses(
        (status = 200, description = "Counts recomputed", body = ApiResponse<RecalcCountsResponseDto>),
        (status = 403, description = "Admin access required")
    ),
    tag = "categories",
    security(("bearer_auth" = []))
)]
pub async fn recalc_counts(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<CategoryService>>,
    AppJson(dto): AppJson<RecalcCountsDto>,
) -> Result<Json<ApiResponse<RecalcCountsResponseDto>>> {
    let updated = service
        .recalc_listing_counts(dto.category_ids.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(
        Some(RecalcCountsResponseDto { updated }),
        None,
        None,
    )))
}
