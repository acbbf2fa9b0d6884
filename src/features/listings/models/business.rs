use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::ListingStatus;

/// Database model for a business (lawyer vertical)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Business {
    pub id: i64,
    pub name: String,
    pub license: Option<String>,
    pub email: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub description: Option<String>,
    pub practice_areas: Option<String>,
    pub language: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub image_url: Option<String>,
    pub works_for: Option<String>,
    pub honors: Option<String>,
    pub work_experience: Option<String>,
    pub associations: Option<String>,
    pub education: Option<String>,
    pub speaking_engagements: Option<String>,
    pub publications: Option<String>,
    pub category_id: Option<i64>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub pending_claim_by: Option<String>,
    pub pending_claim_notes: Option<String>,
    pub pending_claim_requested_at: Option<DateTime<Utc>>,
    pub is_premium: bool,
    pub premium_expires: Option<NaiveDate>,
    pub average_rating: f64,
    pub total_reviews: i32,
    pub status: ListingStatus,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
