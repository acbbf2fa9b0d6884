use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::claim::ClaimState;
use super::columns::Column;
use super::models::{Business, ListingKind, ListingStatus, Provider};

/// Text fields of a listing that search matches and scores against
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchText<'a> {
    pub name: &'a str,
    pub secondary: Option<&'a str>,
    pub description: Option<&'a str>,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub zip: Option<&'a str>,
}

/// Behaviour shared by both listing tables.
///
/// Business and Provider are stored separately; generic services and handlers
/// are written once against this trait and pick the table through `KIND`.
pub trait Listing:
    for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static
{
    const KIND: ListingKind;

    /// Create payload
    type Draft: ListingDraft;
    /// Admin edit payload
    type Patch: ListingPatch;
    /// Profile fields an owner may fill in alongside a claim
    type Edits: OwnerEdit;

    fn id(&self) -> i64;
    fn slug(&self) -> &str;
    fn category_id(&self) -> Option<i64>;
    fn status(&self) -> ListingStatus;
    fn claim_state(&self) -> ClaimState<'_>;
    fn search_text(&self) -> SearchText<'_>;
    fn is_premium(&self) -> bool;
    fn average_rating(&self) -> f64;
    fn updated_at(&self) -> DateTime<Utc>;
    fn into_any(self) -> AnyListing;
}

pub trait ListingDraft: DeserializeOwned + Validate + Send + Sync + 'static {
    fn display_name(&self) -> &str;
    fn category_id(&self) -> Option<i64>;
    /// Every writable column, in a fixed order, so rows can be batched
    fn columns(&self) -> Vec<Column>;
}

pub trait ListingPatch: DeserializeOwned + Validate + Send + Sync + 'static {
    /// `None` keeps the category, `Some(None)` clears it
    fn category_id(&self) -> Option<Option<i64>>;
    fn status(&self) -> Option<ListingStatus>;
    /// Only the columns present in the payload
    fn columns(&self) -> Vec<Column>;
}

/// Owner-editable profile fields. Name, status, category and premium stay admin-only.
pub trait OwnerEdit: DeserializeOwned + Validate + Default + Send + Sync + 'static {
    /// Only the columns present in the payload
    fn columns(&self) -> Vec<Column>;
}

/// Either kind of listing, tagged with its type on the wire
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum AnyListing {
    Business(Business),
    Provider(Provider),
}

impl Listing for Business {
    const KIND: ListingKind = ListingKind::Business;

    type Draft = super::dtos::CreateBusinessDto;
    type Patch = super::dtos::UpdateBusinessDto;
    type Edits = super::dtos::BusinessOwnerEditDto;

    fn id(&self) -> i64 {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn category_id(&self) -> Option<i64> {
        self.category_id
    }

    fn status(&self) -> ListingStatus {
        self.status
    }

    fn claim_state(&self) -> ClaimState<'_> {
        ClaimState::new(self.claimed_by.as_deref(), self.pending_claim_by.as_deref())
    }

    fn search_text(&self) -> SearchText<'_> {
        SearchText {
            name: &self.name,
            secondary: self.practice_areas.as_deref(),
            description: self.description.as_deref(),
            city: self.city.as_deref(),
            state: self.state.as_deref(),
            zip: self.zip.as_deref(),
        }
    }

    fn is_premium(&self) -> bool {
        self.is_premium
    }

    fn average_rating(&self) -> f64 {
        self.average_rating
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn into_any(self) -> AnyListing {
        AnyListing::Business(self)
    }
}

impl Listing for Provider {
    const KIND: ListingKind = ListingKind::Provider;

    type Draft = super::dtos::CreateProviderDto;
    type Patch = super::dtos::UpdateProviderDto;
    type Edits = super::dtos::ProviderOwnerEditDto;

    fn id(&self) -> i64 {
        self.id
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn category_id(&self) -> Option<i64> {
        self.category_id
    }

    fn status(&self) -> ListingStatus {
        self.status
    }

    fn claim_state(&self) -> ClaimState<'_> {
        ClaimState::new(self.claimed_by.as_deref(), self.pending_claim_by.as_deref())
    }

    fn search_text(&self) -> SearchText<'_> {
        SearchText {
            name: &self.provider_name,
            secondary: self.specialty.as_deref(),
            description: self.description.as_deref(),
            city: self.city.as_deref(),
            state: self.state.as_deref(),
            zip: self.zip.as_deref(),
        }
    }

    fn is_premium(&self) -> bool {
        self.is_premium
    }

    fn average_rating(&self) -> f64 {
        self.average_rating
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn into_any(self) -> AnyListing {
        AnyListing::Provider(self)
    }
}
