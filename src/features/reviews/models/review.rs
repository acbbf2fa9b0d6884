use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;

use crate::features::listings::models::{ListingKind, ListingTarget};

/// Review moderation status matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "review_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Active,
    Flagged,
    Removed,
}

/// Database model for a review of a business or provider
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: i64,
    pub target_kind: ListingKind,
    pub target_id: i64,
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

impl Review {
    pub fn target(&self) -> ListingTarget {
        ListingTarget::new(self.target_kind, self.target_id)
    }
}

/// Database model for a moderation flag raised on a review
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct ReviewFlag {
    pub id: i64,
    pub review_id: i64,
    pub flagged_by: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
