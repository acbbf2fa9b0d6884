use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::ListingStatus;

/// Database model for a provider (medical vertical)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Provider {
    pub id: i64,
    pub provider_name: String,
    pub specialty: Option<String>,
    pub email: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub description: Option<String>,
    pub insurances: Option<String>,
    pub practice_names: Option<String>,
    pub languages: Option<String>,
    pub npi_number: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub image_url: Option<String>,
    pub works_for: Option<String>,
    pub popular_visit_reasons: Option<String>,
    pub educations: Option<String>,
    pub gender: Option<String>,
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
