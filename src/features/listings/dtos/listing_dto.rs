use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::listings::models::ListingStatus;
use crate::shared::types::flag_option;

/// Query parameters for listing businesses / providers
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListListingsQuery {
    /// Case-insensitive substring over name, secondary field, description and address
    pub q: Option<String>,
    pub status: Option<ListingStatus>,
    pub category_id: Option<i64>,
    /// Prefix of the category's full path
    pub category_path: Option<String>,
    /// Case-insensitive exact
    pub city: Option<String>,
    /// Case-insensitive exact
    pub state: Option<String>,
    #[serde(default, deserialize_with = "flag_option")]
    pub is_premium: Option<bool>,
    pub claimed_by: Option<String>,
    pub pending_claim_by: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request DTO for claiming a listing
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ClaimDto {
    /// e.g. "Owner", "Office manager"
    #[validate(length(max = 255))]
    pub relationship: Option<String>,
    #[serde(alias = "notes")]
    #[validate(length(max = 4000))]
    pub verification_notes: Option<String>,
}

/// Claim body: the claim itself plus any owner-editable profile fields.
///
/// Both parts read from the same flat JSON object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimRequest<E> {
    #[serde(flatten)]
    pub claim: ClaimDto,
    #[serde(flatten)]
    pub edits: E,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RejectClaimDto {
    /// Replaces the pending claim notes when present
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SetOwnerDto {
    /// `null` or absent clears ownership
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BulkFilters {
    pub status: Option<ListingStatus>,
    /// Case-insensitive exact
    pub city: Option<String>,
    /// Case-insensitive exact
    pub state: Option<String>,
}

/// Request DTO for moving many listings into one subcategory (admin)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkSetCategoryDto {
    pub ids: Option<Vec<i64>>,
    pub from_category_id: Option<i64>,
    pub to_category_id: i64,
    #[serde(default)]
    pub filters: BulkFilters,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkSetCategoryResultDto {
    pub dry_run: bool,
    /// Listings matched by the selection
    pub count: usize,
    /// Listings actually moved (0 on dry runs)
    pub moved: u64,
    pub to_category_id: i64,
    pub from_category_id: Option<i64>,
    /// Root segment shared by every source and the destination
    pub main_category: Option<String>,
}

/// Request DTO for a bulk import (admin)
#[derive(Debug, Clone, Deserialize)]
pub struct BulkCreateDto<D> {
    pub items: Vec<D>,
    /// Status applied to every imported row; defaults to `pending`
    pub status: Option<ListingStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkCreateResultDto {
    pub created: u64,
}
