//! Handlers shared by `/api/businesses` and `/api/providers`.
//!
//! Each handler is generic over the listing kind and is mounted once per kind.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::RequireAdmin;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::listings::dtos::{
    BulkCreateDto, BulkCreateResultDto, BulkSetCategoryDto, BulkSetCategoryResultDto, ClaimRequest,
    ListListingsQuery, RejectClaimDto, SetOwnerDto,
};
use crate::features::listings::listing::{AnyListing, Listing};
use crate::features::listings::models::{Business, ListingKind, Provider};
use crate::features::listings::services::ListingService;
use crate::shared::types::{ApiResponse, Meta};

/// State for listing handlers
#[derive(Clone)]
pub struct ListingState {
    pub businesses: Arc<ListingService<Business>>,
    pub providers: Arc<ListingService<Provider>>,
}

/// Picks the service for a listing kind out of the shared state
pub trait ListingRoute: Listing {
    fn service(state: &ListingState) -> &ListingService<Self>;
}

impl ListingRoute for Business {
    fn service(state: &ListingState) -> &ListingService<Self> {
        &state.businesses
    }
}

impl ListingRoute for Provider {
    fn service(state: &ListingState) -> &ListingService<Self> {
        &state.providers
    }
}

pub async fn list_listings<T: ListingRoute>(
    State(state): State<ListingState>,
    AppQuery(query): AppQuery<ListListingsQuery>,
) -> Result<Json<ApiResponse<Vec<T>>>> {
    let (items, total) = T::service(&state).list(&query).await?;
    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

pub async fn featured_listings<T: ListingRoute>(
    State(state): State<ListingState>,
) -> Result<Json<ApiResponse<Vec<T>>>> {
    let items = T::service(&state).featured().await?;
    Ok(Json(ApiResponse::success(Some(items), None, None)))
}

pub async fn get_listing<T: ListingRoute>(
    State(state): State<ListingState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<T>>> {
    let listing = T::service(&state).get(id).await?;
    Ok(Json(ApiResponse::success(Some(listing), None, None)))
}

/// Business slugs fall back to providers so old shared links keep resolving
pub async fn get_listing_by_slug<T: ListingRoute>(
    State(state): State<ListingState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<AnyListing>>> {
    if let Some(listing) = T::service(&state).find_by_slug(&slug).await? {
        return Ok(Json(ApiResponse::success(Some(listing.into_any()), None, None)));
    }
    if T::KIND == ListingKind::Business {
        if let Some(provider) = state.providers.find_by_slug(&slug).await? {
            return Ok(Json(ApiResponse::success(Some(provider.into_any()), None, None)));
        }
    }
    Err(AppError::NotFound(format!("{} {} not found", T::KIND, slug)))
}

/// `/by-path/<category path>/<listing slug>`
pub async fn get_listing_by_path<T: ListingRoute>(
    State(state): State<ListingState>,
    Path(rest): Path<String>,
) -> Result<Json<ApiResponse<AnyListing>>> {
    let (category_path, slug) = split_listing_path(&rest)?;

    if let Some(listing) = T::service(&state).find_by_path(category_path, slug).await? {
        return Ok(Json(ApiResponse::success(Some(listing.into_any()), None, None)));
    }
    if T::KIND == ListingKind::Business {
        if let Some(provider) = state.providers.find_by_path(category_path, slug).await? {
            return Ok(Json(ApiResponse::success(Some(provider.into_any()), None, None)));
        }
    }
    Err(AppError::NotFound("Not found.".to_string()))
}

fn split_listing_path(rest: &str) -> Result<(&str, &str)> {
    let trimmed = rest.trim_matches('/');
    match trimmed.rsplit_once('/') {
        Some((path, slug)) if !path.is_empty() && !slug.is_empty() => Ok((path, slug)),
        _ => Err(AppError::BadRequest(
            "Expected <category path>/<listing slug>".to_string(),
        )),
    }
}

/// Submit a listing; it stays `pending` until an admin activates it
pub async fn create_listing<T: ListingRoute>(
    user: AuthenticatedUser,
    State(state): State<ListingState>,
    AppJson(dto): AppJson<T::Draft>,
) -> Result<(StatusCode, Json<ApiResponse<T>>)> {
    dto.validate()?;

    let listing = T::service(&state).create(dto).await?;
    tracing::debug!(user_id = %user.user_id, id = listing.id(), "Listing submitted");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(listing),
            Some("Listing submitted for review".to_string()),
            None,
        )),
    ))
}

pub async fn update_listing<T: ListingRoute>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<ListingState>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<T::Patch>,
) -> Result<Json<ApiResponse<T>>> {
    dto.validate()?;

    let listing = T::service(&state).update(id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(listing),
        Some("Listing updated successfully".to_string()),
        None,
    )))
}

pub async fn delete_listing<T: ListingRoute>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<ListingState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    T::service(&state).delete(id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Listing deleted successfully".to_string()),
        None,
    )))
}

pub async fn claim_listing<T: ListingRoute>(
    user: AuthenticatedUser,
    State(state): State<ListingState>,
    Path(id): Path<i64>,
    AppJson(request): AppJson<ClaimRequest<T::Edits>>,
) -> Result<Json<ApiResponse<T>>> {
    request.claim.validate()?;
    request.edits.validate()?;

    let listing = T::service(&state).claim(id, &user.user_id, &request).await?;
    Ok(Json(ApiResponse::success(
        Some(listing),
        Some("Claim submitted for review".to_string()),
        None,
    )))
}

pub async fn approve_claim<T: ListingRoute>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<ListingState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<T>>> {
    let listing = T::service(&state).approve_claim(id).await?;
    Ok(Json(ApiResponse::success(
        Some(listing),
        Some("Claim approved".to_string()),
        None,
    )))
}

pub async fn reject_claim<T: ListingRoute>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<ListingState>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<RejectClaimDto>,
) -> Result<Json<ApiResponse<T>>> {
    let listing = T::service(&state)
        .reject_claim(id, dto.note.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(
        Some(listing),
        Some("Claim rejected".to_string()),
        None,
    )))
}

pub async fn set_owner<T: ListingRoute>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<ListingState>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<SetOwnerDto>,
) -> Result<Json<ApiResponse<T>>> {
    let listing = T::service(&state)
        .set_owner(id, dto.user_id.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(Some(listing), None, None)))
}

pub async fn bulk_set_category<T: ListingRoute>(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<ListingState>,
    AppJson(dto): AppJson<BulkSetCategoryDto>,
) -> Result<Json<ApiResponse<BulkSetCategoryResultDto>>> {
    let result = T::service(&state).bulk_set_category(&dto).await?;
    Ok(Json(ApiResponse::success(Some(result), None, None)))
}

pub async fn bulk_create<T: ListingRoute>(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<ListingState>,
    AppJson(dto): AppJson<BulkCreateDto<T::Draft>>,
) -> Result<(StatusCode, Json<ApiResponse<BulkCreateResultDto>>)> {
    tracing::info!(user_id = %admin.user_id, items = dto.items.len(), kind = %T::KIND, "Bulk import requested");

    let result = T::service(&state).bulk_create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(result), None, None)),
    ))
}
