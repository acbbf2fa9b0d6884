use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::Result;
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::{MaybeUser, RequireAdmin};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::reviews::dtos::{
    CreateReviewDto, FlagReviewDto, ListReviewsQuery, ReplyDto, ReviewFlagResponseDto,
    ReviewResponseDto, UpdateReviewDto, UpdateReviewStatusDto,
};
use crate::features::reviews::models::ReviewStatus;
use crate::features::reviews::services::ReviewService;
use crate::shared::types::{ApiResponse, Meta};

/// Visitors only see active reviews, except their own; admins see everything
fn scope_to_caller(mut query: ListReviewsQuery, caller: Option<&AuthenticatedUser>) -> ListReviewsQuery {
    let is_admin = caller.is_some_and(|c| c.is_admin());
    let own = caller.is_some_and(|c| query.user_id.as_deref() == Some(c.user_id.as_str()));
    if !is_admin && !own {
        query.status = Some(ReviewStatus::Active);
    }
    query
}

/// List reviews, optionally for one listing
#[utoipa::path(
    get,
    path = "/api/reviews",
    params(ListReviewsQuery),
    responses(
        (status = 200, description = "Page of reviews", body = ApiResponse<Vec<ReviewResponseDto>>),
        (status = 400, description = "Invalid filter value")
    ),
    tag = "reviews"
)]
pub async fn list_reviews(
    MaybeUser(caller): MaybeUser,
    State(service): State<Arc<ReviewService>>,
    AppQuery(query): AppQuery<ListReviewsQuery>,
) -> Result<Json<ApiResponse<Vec<ReviewResponseDto>>>> {
    let query = scope_to_caller(query, caller.as_ref());
    let (reviews, total) = service.list(&query).await?;
    let dtos = reviews.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(
        Some(dtos),
        None,
        Some(Meta { total }),
    )))
}

/// Latest active reviews
#[utoipa::path(
    get,
    path = "/api/reviews/recent",
    responses(
        (status = 200, description = "Recent reviews", body = ApiResponse<Vec<ReviewResponseDto>>),
    ),
    tag = "reviews"
)]
pub async fn recent_reviews(
    State(service): State<Arc<ReviewService>>,
) -> Result<Json<ApiResponse<Vec<ReviewResponseDto>>>> {
    let dtos = service.recent().await?.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(Some(dtos), None, None)))
}

/// Get a review by id
#[utoipa::path(
    get,
    path = "/api/reviews/{id}",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review found", body = ApiResponse<ReviewResponseDto>),
        (status = 404, description = "Review not found")
    ),
    tag = "reviews"
)]
pub async fn get_review(
    State(service): State<Arc<ReviewService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ReviewResponseDto>>> {
    let review = service.get(id).await?;
    Ok(Json(ApiResponse::success(Some(review.into()), None, None)))
}

/// Write a review; it is published once an admin approves it
#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = CreateReviewDto,
    responses(
        (status = 201, description = "Review submitted", body = ApiResponse<ReviewResponseDto>),
        (status = 400, description = "Validation error or unknown listing"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "reviews",
    security(("bearer_auth" = []))
)]
pub async fn create_review(
    user: AuthenticatedUser,
    State(service): State<Arc<ReviewService>>,
    AppJson(dto): AppJson<CreateReviewDto>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewResponseDto>>)> {
    dto.validate()?;

    let review = service.create(&user, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(review.into()),
            Some("Review submitted for moderation".to_string()),
            None,
        )),
    ))
}

/// Edit a review (author or admin)
#[utoipa::path(
    patch,
    path = "/api/reviews/{id}",
    params(("id" = i64, Path, description = "Review id")),
    request_body = UpdateReviewDto,
    responses(
        (status = 200, description = "Review updated", body = ApiResponse<ReviewResponseDto>),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Review not found")
    ),
    tag = "reviews",
    security(("bearer_auth" = []))
)]
pub async fn update_review(
    user: AuthenticatedUser,
    State(service): State<Arc<ReviewService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateReviewDto>,
) -> Result<Json<ApiResponse<ReviewResponseDto>>> {
    dto.validate()?;

    let review = service.update(id, &user, dto).await?;
    Ok(Json(ApiResponse::success(Some(review.into()), None, None)))
}

/// Delete a review (author or admin)
#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Review not found")
    ),
    tag = "reviews",
    security(("bearer_auth" = []))
)]
pub async fn delete_review(
    user: AuthenticatedUser,
    State(service): State<Arc<ReviewService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id, &user).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Review deleted successfully".to_string()),
        None,
    )))
}

/// Moderate a review (admin)
#[utoipa::path(
    patch,
    path = "/api/reviews/{id}/status",
    params(("id" = i64, Path, description = "Review id")),
    request_body = UpdateReviewStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ReviewResponseDto>),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Review not found")
    ),
    tag = "reviews",
    security(("bearer_auth" = []))
)]
pub async fn update_review_status(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<ReviewService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateReviewStatusDto>,
) -> Result<Json<ApiResponse<ReviewResponseDto>>> {
    let review = service.set_status(id, dto.status, dto.verified).await?;
    Ok(Json(ApiResponse::success(Some(review.into()), None, None)))
}

/// Reply to a review (listing owner or admin)
#[utoipa::path(
    post,
    path = "/api/reviews/{id}/reply",
    params(("id" = i64, Path, description = "Review id")),
    request_body = ReplyDto,
    responses(
        (status = 200, description = "Reply saved", body = ApiResponse<ReviewResponseDto>),
        (status = 400, description = "Empty reply"),
        (status = 403, description = "Not the listing owner")
    ),
    tag = "reviews",
    security(("bearer_auth" = []))
)]
pub async fn reply_to_review(
    user: AuthenticatedUser,
    State(service): State<Arc<ReviewService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<ReplyDto>,
) -> Result<Json<ApiResponse<ReviewResponseDto>>> {
    let review = service.reply(id, &user, &dto.content).await?;
    Ok(Json(ApiResponse::success(Some(review.into()), None, None)))
}

/// Remove the owner reply (listing owner or admin)
#[utoipa::path(
    delete,
    path = "/api/reviews/{id}/reply",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "Reply removed", body = ApiResponse<ReviewResponseDto>),
        (status = 403, description = "Not the listing owner")
    ),
    tag = "reviews",
    security(("bearer_auth" = []))
)]
pub async fn delete_review_reply(
    user: AuthenticatedUser,
    State(service): State<Arc<ReviewService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ReviewResponseDto>>> {
    let review = service.delete_reply(id, &user).await?;
    Ok(Json(ApiResponse::success(Some(review.into()), None, None)))
}

/// Count a "helpful" vote
#[utoipa::path(
    post,
    path = "/api/reviews/{id}/helpful",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "Vote counted", body = ApiResponse<ReviewResponseDto>),
        (status = 404, description = "Review not found")
    ),
    tag = "reviews"
)]
pub async fn mark_review_helpful(
    State(service): State<Arc<ReviewService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ReviewResponseDto>>> {
    let review = service.mark_helpful(id).await?;
    Ok(Json(ApiResponse::success(Some(review.into()), None, None)))
}

/// Flag a review for moderation
#[utoipa::path(
    post,
    path = "/api/reviews/{id}/flag",
    params(("id" = i64, Path, description = "Review id")),
    request_body = FlagReviewDto,
    responses(
        (status = 200, description = "Review flagged", body = ApiResponse<ReviewResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Review not found")
    ),
    tag = "reviews",
    security(("bearer_auth" = []))
)]
pub async fn flag_review(
    user: AuthenticatedUser,
    State(service): State<Arc<ReviewService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<FlagReviewDto>,
) -> Result<Json<ApiResponse<ReviewResponseDto>>> {
    let review = service.flag(id, &user, dto.note.as_deref()).await?;
    Ok(Json(ApiResponse::success(Some(review.into()), None, None)))
}

/// Flags raised on a review (admin)
#[utoipa::path(
    get,
    path = "/api/reviews/{id}/flags",
    params(("id" = i64, Path, description = "Review id")),
    responses(
        (status = 200, description = "Flags, newest first", body = ApiResponse<Vec<ReviewFlagResponseDto>>),
        (status = 403, description = "Admin access required")
    ),
    tag = "reviews",
    security(("bearer_auth" = []))
)]
pub async fn list_review_flags(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<ReviewService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<ReviewFlagResponseDto>>>> {
    let flags = service.flags(id).await?.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(Some(flags), None, None)))
}
