use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::listings::models::{ListingKind, ListingTarget};
use crate::features::reviews::models::{Review, ReviewFlag, ReviewStatus};

/// Response DTO for a review
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponseDto {
    pub id: i64,
    pub target: ListingTarget,
    pub user_id: String,
    pub rating: i16,
    pub title: String,
    pub content: String,
    pub verified: bool,
    pub helpful_count: i32,
    pub status: ReviewStatus,
    pub owner_reply: Option<String>,
    pub owner_replied_at: Option<DateTime<Utc>>,
    pub owner_replied_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponseDto {
    fn from(review: Review) -> Self {
        Self {
            target: review.target(),
            id: review.id,
            user_id: review.user_id,
            rating: review.rating,
            title: review.title,
            content: review.content,
            verified: review.verified,
            helpful_count: review.helpful_count,
            status: review.status,
            owner_reply: review.owner_reply,
            owner_replied_at: review.owner_replied_at,
            owner_replied_by: review.owner_replied_by,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

/// Response DTO for a review flag (admin)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewFlagResponseDto {
    pub id: i64,
    pub flagged_by: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewFlag> for ReviewFlagResponseDto {
    fn from(flag: ReviewFlag) -> Self {
        Self {
            id: flag.id,
            flagged_by: flag.flagged_by,
            reason: flag.note,
            created_at: flag.created_at,
        }
    }
}

/// Query parameters for listing reviews
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListReviewsQuery {
    /// Restrict to one listing kind; combine with `target_id`
    pub kind: Option<ListingKind>,
    pub target_id: Option<i64>,
    pub status: Option<ReviewStatus>,
    pub user_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request DTO for writing a review; it starts `pending`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReviewDto {
    pub target: ListingTarget,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

/// Request DTO for the author editing their review
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateReviewDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: Option<String>,
}

/// Request DTO for moderating a review (admin)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateReviewStatusDto {
    pub status: ReviewStatus,
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReplyDto {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FlagReviewDto {
    pub note: Option<String>,
}
