use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Column list matching `Category`'s `FromRow` layout
pub const CATEGORY_COLUMNS: &str = "id, parent_id, name, slug, full_slug, description, icon, color, business_count, created_at, updated_at";

/// Database model for category
#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    /// Unique among siblings only
    pub slug: String,
    /// Materialized path, e.g. `Lawyers/Personal_Injury_Lawyers`
    pub full_slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Active listings (business + provider) assigned directly to this node
    pub business_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One hop of a parent chain, as loaded for breadcrumbs
#[derive(Debug, Clone, FromRow)]
pub struct CategoryLink {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub full_slug: String,
}
