use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::categories::models::{Category, CategoryLink};
use crate::shared::types::double_option;

/// Response DTO for category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseDto {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub full_slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub business_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Root-to-self chain; only filled on single-category lookups
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breadcrumb: Vec<BreadcrumbItem>,
}

impl From<Category> for CategoryResponseDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            parent_id: c.parent_id,
            name: c.name,
            slug: c.slug,
            full_slug: c.full_slug,
            description: c.description,
            icon: c.icon,
            color: c.color,
            business_count: c.business_count,
            created_at: c.created_at,
            updated_at: c.updated_at,
            breadcrumb: Vec::new(),
        }
    }
}

impl CategoryResponseDto {
    pub fn with_breadcrumb(mut self, breadcrumb: Vec<BreadcrumbItem>) -> Self {
        self.breadcrumb = breadcrumb;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BreadcrumbItem {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub full_slug: String,
}

impl From<&CategoryLink> for BreadcrumbItem {
    fn from(link: &CategoryLink) -> Self {
        Self {
            id: link.id,
            name: link.name.clone(),
            slug: link.slug.clone(),
            full_slug: link.full_slug.clone(),
        }
    }
}

/// Response DTO for category tree (hierarchical structure)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(no_recursion)]
pub struct CategoryTreeDto {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub full_slug: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub business_count: i32,
    pub children: Vec<CategoryTreeDto>,
}

impl CategoryTreeDto {
    /// Build tree from a flat list ordered by `full_slug`
    pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryTreeDto> {
        let roots: Vec<&Category> = categories
            .iter()
            .filter(|c| c.parent_id.is_none())
            .collect();

        roots
            .into_iter()
            .map(|root| Self::build_node(root, &categories))
            .collect()
    }

    fn build_node(category: &Category, all_categories: &[Category]) -> CategoryTreeDto {
        let children: Vec<CategoryTreeDto> = all_categories
            .iter()
            .filter(|c| c.parent_id == Some(category.id) && c.id != category.id)
            .map(|child| Self::build_node(child, all_categories))
            .collect();

        CategoryTreeDto {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            full_slug: category.full_slug.clone(),
            icon: category.icon.clone(),
            color: category.color.clone(),
            business_count: category.business_count,
            children,
        }
    }
}

/// Query params for listing categories
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListCategoriesQuery {
    /// If true, return tree structure. Default: false (flat list)
    #[serde(default)]
    pub tree: bool,
}

/// Request DTO for creating a category
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Derived from `name` when omitted
    #[validate(
        length(min = 1, max = 120, message = "Slug must be 1-120 characters"),
        regex(
            path = *crate::shared::validation::CATEGORY_SLUG_REGEX,
            message = "Slug must be letters and digits joined by single '_' or '-'"
        )
    )]
    pub slug: Option<String>,

    pub parent_id: Option<i64>,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    #[validate(length(max = 50))]
    pub color: Option<String>,
}

/// Request DTO for renaming / reparenting / editing a category
///
/// `parent_id`: absent keeps the parent, `null` moves the node to the root.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(
        length(min = 1, max = 120, message = "Slug must be 1-120 characters"),
        regex(
            path = *crate::shared::validation::CATEGORY_SLUG_REGEX,
            message = "Slug must be letters and digits joined by single '_' or '-'"
        )
    )]
    pub slug: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub parent_id: Option<Option<i64>>,

    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    #[validate(length(max = 50))]
    pub color: Option<String>,
}

/// Request DTO for an explicit count recompute
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RecalcCountsDto {
    /// Omit to recompute every category
    pub category_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecalcCountsResponseDto {
    /// Categories whose stored count actually changed
    pub updated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingCountDto {
    pub category_id: i64,
    pub count: i64,
}
