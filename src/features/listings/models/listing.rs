use serde::{Deserialize, Serialize};
use sqlx::Type;
use utoipa::ToSchema;

/// Listing lifecycle status matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "listing_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Pending,
    Active,
    Suspended,
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingStatus::Pending => write!(f, "pending"),
            ListingStatus::Active => write!(f, "active"),
            ListingStatus::Suspended => write!(f, "suspended"),
        }
    }
}

/// Which listing table a record lives in, matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "listing_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Business,
    Provider,
}

impl ListingKind {
    pub fn table(&self) -> &'static str {
        match self {
            ListingKind::Business => "businesses",
            ListingKind::Provider => "providers",
        }
    }

    /// Primary display-name column
    pub fn name_column(&self) -> &'static str {
        match self {
            ListingKind::Business => "name",
            ListingKind::Provider => "provider_name",
        }
    }

    /// Secondary descriptive column scored by search
    pub fn secondary_column(&self) -> &'static str {
        match self {
            ListingKind::Business => "practice_areas",
            ListingKind::Provider => "specialty",
        }
    }

    /// Extra columns that widen the search match set without scoring
    pub fn extra_match_columns(&self) -> &'static [&'static str] {
        match self {
            ListingKind::Business => &[],
            ListingKind::Provider => &["npi_number"],
        }
    }

    /// Slug used when a display name has no sluggable characters
    pub fn slug_fallback(&self) -> &'static str {
        match self {
            ListingKind::Business => "business",
            ListingKind::Provider => "provider",
        }
    }
}

impl std::fmt::Display for ListingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingKind::Business => write!(f, "business"),
            ListingKind::Provider => write!(f, "provider"),
        }
    }
}

/// A reference to exactly one listing of either kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ListingTarget {
    Business(i64),
    Provider(i64),
}

impl ListingTarget {
    pub fn new(kind: ListingKind, id: i64) -> Self {
        match kind {
            ListingKind::Business => ListingTarget::Business(id),
            ListingKind::Provider => ListingTarget::Provider(id),
        }
    }

    pub fn kind(&self) -> ListingKind {
        match self {
            ListingTarget::Business(_) => ListingKind::Business,
            ListingTarget::Provider(_) => ListingKind::Provider,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            ListingTarget::Business(id) | ListingTarget::Provider(id) => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_columns() {
        assert_eq!(ListingKind::Business.table(), "businesses");
        assert_eq!(ListingKind::Provider.name_column(), "provider_name");
        assert_eq!(ListingKind::Business.secondary_column(), "practice_areas");
        assert_eq!(ListingKind::Provider.extra_match_columns(), &["npi_number"]);
    }

    #[test]
    fn test_target_roundtrips_kind_and_id() {
        let target = ListingTarget::new(ListingKind::Provider, 42);
        assert_eq!(target, ListingTarget::Provider(42));
        assert_eq!(target.kind(), ListingKind::Provider);
        assert_eq!(target.id(), 42);
    }

    #[test]
    fn test_target_serialization() {
        let json = serde_json::to_value(ListingTarget::Business(7)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "business", "id": 7}));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(ListingStatus::Suspended).unwrap();
        assert_eq!(json, "suspended");
        let parsed: ListingStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(parsed, ListingStatus::Active);
    }
}
