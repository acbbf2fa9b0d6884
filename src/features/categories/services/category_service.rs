use std::collections::{BTreeSet, HashMap, HashSet};

use sqlx::{PgConnection, PgPool};

use crate::core::config::DirectoryConfig;
use crate::core::database::db_error;
use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{
    BreadcrumbItem, CategoryTreeDto, CreateCategoryDto, UpdateCategoryDto,
};
use crate::features::categories::models::{Category, CategoryLink, CATEGORY_COLUMNS};
use crate::features::categories::tree;
use crate::shared::constants::TOP_CATEGORIES_LIMIT;
use crate::shared::slug::{disambiguate, make_category_slug};
use crate::shared::sql::{descendants_pattern, like_escape};

/// Service for the category tree
pub struct CategoryService {
    pool: PgPool,
    count_active_only: bool,
    chunk_size: usize,
    max_ancestor_hops: i64,
    max_breadcrumb_depth: usize,
}

impl CategoryService {
    pub fn new(pool: PgPool, config: &DirectoryConfig) -> Self {
        Self {
            pool,
            count_active_only: config.count_active_only,
            chunk_size: config.bulk_chunk_size.max(1),
            max_ancestor_hops: config.max_ancestor_hops,
            max_breadcrumb_depth: config.max_breadcrumb_depth,
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// List all categories ordered by path
    pub async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories ORDER BY full_slug",
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list categories"))
    }

    pub async fn tree(&self) -> Result<Vec<CategoryTreeDto>> {
        let categories = self.list().await?;
        Ok(CategoryTreeDto::build_tree(categories))
    }

    pub async fn get(&self, id: i64) -> Result<Category> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
    }

    pub async fn find(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get category"))
    }

    /// First category (by path) carrying this sibling slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Category> {
        let sql = format!(
            "SELECT {} FROM categories WHERE slug = $1 ORDER BY full_slug LIMIT 1",
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get category by slug"))?
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", slug)))
    }

    /// Exact path match first, then case-insensitive
    pub async fn get_by_path(&self, path: &str) -> Result<Category> {
        let clean = path.trim_matches('/');
        self.find_by_path(clean)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", clean)))
    }

    pub async fn find_by_path(&self, path: &str) -> Result<Option<Category>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE full_slug = $1 LIMIT 1",
            CATEGORY_COLUMNS
        );
        let exact = sqlx::query_as::<_, Category>(&sql)
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get category by path"))?;
        if exact.is_some() {
            return Ok(exact);
        }

        let sql = format!(
            "SELECT {} FROM categories WHERE full_slug ILIKE $1 ESCAPE '\\' ORDER BY full_slug LIMIT 1",
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, Category>(&sql)
            .bind(like_escape(path))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get category by path"))
    }

    /// Top categories by live active listing count; `business_count` carries that count
    pub async fn top(&self) -> Result<Vec<Category>> {
        let sql = r#"
            SELECT c.id, c.parent_id, c.name, c.slug, c.full_slug, c.description, c.icon,
                   c.color,
                   (COALESCE(b.n, 0) + COALESCE(p.n, 0))::INT AS business_count,
                   c.created_at, c.updated_at
            FROM categories c
            LEFT JOIN (
                SELECT category_id, COUNT(*) AS n FROM businesses
                WHERE status = 'active' GROUP BY category_id
            ) b ON b.category_id = c.id
            LEFT JOIN (
                SELECT category_id, COUNT(*) AS n FROM providers
                WHERE status = 'active' GROUP BY category_id
            ) p ON p.category_id = c.id
            ORDER BY business_count DESC, c.full_slug
            LIMIT $1
        "#;
        sqlx::query_as::<_, Category>(sql)
            .bind(TOP_CATEGORIES_LIMIT)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list top categories"))
    }

    /// Root-to-node chain for a category
    pub async fn breadcrumb(&self, id: i64) -> Result<Vec<BreadcrumbItem>> {
        let depth = self.max_breadcrumb_depth as i64 + 1;
        let links = sqlx::query_as::<_, CategoryLink>(
            r#"
            WITH RECURSIVE chain AS (
                SELECT id, parent_id, name, slug, full_slug, 1 AS depth
                FROM categories WHERE id = $1
                UNION ALL
                SELECT c.id, c.parent_id, c.name, c.slug, c.full_slug, chain.depth + 1
                FROM categories c
                JOIN chain ON c.id = chain.parent_id
                WHERE chain.depth < $2
            )
            SELECT id, parent_id, name, slug, full_slug FROM chain
            "#,
        )
        .bind(id)
        .bind(depth)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load category chain"))?;

        if links.is_empty() {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }

        let map: HashMap<i64, CategoryLink> = links.into_iter().map(|l| (l.id, l)).collect();
        Ok(tree::build_breadcrumb(id, &map, self.max_breadcrumb_depth))
    }

    /// Live count of active listings (business + provider) assigned to the category
    pub async fn listing_count(&self, id: i64) -> Result<i64> {
        self.get(id).await?;

        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT (SELECT COUNT(*) FROM businesses WHERE category_id = $1 AND status = 'active')
                 + (SELECT COUNT(*) FROM providers WHERE category_id = $1 AND status = 'active')
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to count category listings"))
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    pub async fn create(&self, dto: CreateCategoryDto) -> Result<Category> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let parent_full_slug = match dto.parent_id {
            Some(parent_id) => Some(self.parent_full_slug(&mut *tx, parent_id).await?),
            None => None,
        };

        let base = dto
            .slug
            .clone()
            .unwrap_or_else(|| make_category_slug(&dto.name));
        let slug = self
            .free_sibling_slug(&mut *tx, dto.parent_id, &base, None)
            .await?;
        let full_slug = tree::compose_full_slug(parent_full_slug.as_deref(), &slug);

        let sql = format!(
            r#"
            INSERT INTO categories (name, slug, full_slug, parent_id, description, icon, color)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(dto.name.trim())
            .bind(&slug)
            .bind(&full_slug)
            .bind(dto.parent_id)
            .bind(&dto.description)
            .bind(&dto.icon)
            .bind(&dto.color)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to create category"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit category create"))?;

        tracing::info!(id = category.id, full_slug = %category.full_slug, "Category created");
        Ok(category)
    }

    /// Rename / reparent / edit a category.
    ///
    /// The node save and the rewrite of every descendant path commit together.
    pub async fn update(&self, id: i64, dto: UpdateCategoryDto) -> Result<Category> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let sql = format!(
            "SELECT {} FROM categories WHERE id = $1 FOR UPDATE",
            CATEGORY_COLUMNS
        );
        let current = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to lock category"))?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

        let parent_id = match dto.parent_id {
            Some(parent_id) => parent_id,
            None => current.parent_id,
        };
        let parent_changed = parent_id != current.parent_id;

        if parent_changed {
            let parents = self.parent_chain(&mut *tx, parent_id).await?;
            tree::validate_ancestry(Some(id), parent_id, &parents, self.max_ancestor_hops)?;
        }

        let name = dto
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.name)
            .to_string();
        let name_changed = name != current.name;

        let base = match (&dto.slug, name_changed) {
            (Some(explicit), _) => explicit.clone(),
            (None, true) => make_category_slug(&name),
            (None, false) => current.slug.clone(),
        };
        let slug = if base == current.slug && !parent_changed {
            base
        } else {
            self.free_sibling_slug(&mut *tx, parent_id, &base, Some(id))
                .await?
        };

        let parent_full_slug = match parent_id {
            Some(parent_id) => Some(self.parent_full_slug(&mut *tx, parent_id).await?),
            None => None,
        };
        let full_slug = tree::compose_full_slug(parent_full_slug.as_deref(), &slug);

        let sql = format!(
            r#"
            UPDATE categories
            SET name = $2, slug = $3, full_slug = $4, parent_id = $5,
                description = COALESCE($6, description),
                icon = COALESCE($7, icon),
                color = COALESCE($8, color),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        );
        let updated = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .bind(&name)
            .bind(&slug)
            .bind(&full_slug)
            .bind(parent_id)
            .bind(&dto.description)
            .bind(&dto.icon)
            .bind(&dto.color)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to update category"))?;

        let rewritten = if updated.full_slug != current.full_slug {
            Self::rewrite_descendant_paths(&mut *tx, &current.full_slug, &updated.full_slug)
                .await?
        } else {
            0
        };

        tx.commit()
            .await
            .map_err(db_error("Failed to commit category update"))?;

        tracing::info!(
            id,
            old = %current.full_slug,
            new = %updated.full_slug,
            descendants = rewritten,
            "Category updated"
        );
        Ok(updated)
    }

    /// Protect semantics: a node with children cannot be removed
    pub async fn delete(&self, id: i64) -> Result<()> {
        let has_children = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM categories WHERE parent_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check category children"))?;

        if has_children {
            return Err(AppError::Conflict(
                "Cannot delete a category that still has subcategories".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete category"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }

        tracing::info!(id, "Category deleted");
        Ok(())
    }

    /// Recompute `business_count` for the given categories, or all when `None`.
    ///
    /// Only rows whose stored count differs are written. Returns how many changed.
    pub async fn recalc_listing_counts(&self, category_ids: Option<&[i64]>) -> Result<usize> {
        let ids: Option<Vec<i64>> = match category_ids {
            Some(ids) => {
                let unique: BTreeSet<i64> = ids.iter().copied().filter(|id| *id > 0).collect();
                if unique.is_empty() {
                    return Ok(0);
                }
                Some(unique.into_iter().collect())
            }
            None => None,
        };

        let rows = sqlx::query_as::<_, (i64, i32, i64)>(
            r#"
            SELECT c.id, c.business_count, COALESCE(n.total, 0)::BIGINT
            FROM categories c
            LEFT JOIN (
                SELECT category_id, COUNT(*) AS total
                FROM (
                    SELECT category_id FROM businesses
                    WHERE category_id IS NOT NULL AND (NOT $1 OR status = 'active')
                    UNION ALL
                    SELECT category_id FROM providers
                    WHERE category_id IS NOT NULL AND (NOT $1 OR status = 'active')
                ) listings
                GROUP BY category_id
            ) n ON n.category_id = c.id
            WHERE $2::BIGINT[] IS NULL OR c.id = ANY($2)
            "#,
        )
        .bind(self.count_active_only)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to compute category counts"))?;

        let changed = tree::changed_counts(&rows);
        if changed.is_empty() {
            return Ok(0);
        }

        for chunk in changed.chunks(self.chunk_size) {
            let (ids, counts): (Vec<i64>, Vec<i32>) = chunk.iter().copied().unzip();
            sqlx::query(
                r#"
                UPDATE categories AS c
                SET business_count = u.total
                FROM UNNEST($1::BIGINT[], $2::INT[]) AS u(id, total)
                WHERE c.id = u.id
                "#,
            )
            .bind(&ids)
            .bind(&counts)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to persist category counts"))?;
        }

        tracing::debug!(changed = changed.len(), "Category counts recomputed");
        Ok(changed.len())
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Locks the parent `FOR SHARE`: a concurrent rename holds it `FOR UPDATE`, so this
    /// waits for that commit and sees the new path instead of writing a stale prefix.
    async fn parent_full_slug(&self, conn: &mut PgConnection, parent_id: i64) -> Result<String> {
        sqlx::query_scalar::<_, String>(
            "SELECT full_slug FROM categories WHERE id = $1 FOR SHARE",
        )
            .bind(parent_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_error("Failed to load parent category"))?
            .ok_or_else(|| AppError::Validation(format!("Parent category {} not found", parent_id)))
    }

    /// Ancestor id -> parent id, starting at `start`, bounded by the hop cap
    async fn parent_chain(
        &self,
        conn: &mut PgConnection,
        start: Option<i64>,
    ) -> Result<HashMap<i64, Option<i64>>> {
        let Some(start) = start else {
            return Ok(HashMap::new());
        };

        let rows = sqlx::query_as::<_, (i64, Option<i64>)>(
            r#"
            WITH RECURSIVE chain AS (
                SELECT id, parent_id, 1 AS depth FROM categories WHERE id = $1
                UNION ALL
                SELECT c.id, c.parent_id, chain.depth + 1
                FROM categories c
                JOIN chain ON c.id = chain.parent_id
                WHERE chain.depth < $2
            )
            SELECT id, parent_id FROM chain
            "#,
        )
        .bind(start)
        .bind(self.max_ancestor_hops)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("Failed to load category ancestors"))?;

        if rows.is_empty() {
            return Err(AppError::Validation(format!(
                "Parent category {} not found",
                start
            )));
        }

        Ok(rows.into_iter().collect())
    }

    /// First of `base`, `base_2`, `base_3`, ... not used by another sibling
    async fn free_sibling_slug(
        &self,
        conn: &mut PgConnection,
        parent_id: Option<i64>,
        base: &str,
        exclude_id: Option<i64>,
    ) -> Result<String> {
        let taken: HashSet<String> = sqlx::query_scalar::<_, String>(
            r#"
            SELECT slug FROM categories
            WHERE parent_id IS NOT DISTINCT FROM $1
              AND (slug = $2 OR slug LIKE $3 ESCAPE '\')
              AND ($4::BIGINT IS NULL OR id <> $4)
            "#,
        )
        .bind(parent_id)
        .bind(base)
        .bind(format!("{}\\_%", like_escape(base)))
        .bind(exclude_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("Failed to load sibling slugs"))?
        .into_iter()
        .collect();

        Ok(disambiguate(base, '_', 2, |candidate| taken.contains(candidate)))
    }

    /// Move every strict descendant from `old/...` to `new/...` in one bulk write
    async fn rewrite_descendant_paths(
        conn: &mut PgConnection,
        old_full_slug: &str,
        new_full_slug: &str,
    ) -> Result<usize> {
        let descendants = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, full_slug FROM categories WHERE full_slug LIKE $1 ESCAPE '\\' FOR UPDATE",
        )
        .bind(descendants_pattern(old_full_slug))
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error("Failed to load descendant paths"))?;

        let (ids, paths): (Vec<i64>, Vec<String>) = descendants
            .iter()
            .filter_map(|(id, full_slug)| {
                tree::rewrite_prefix(full_slug, old_full_slug, new_full_slug)
                    .map(|path| (*id, path))
            })
            .unzip();

        if ids.is_empty() {
            return Ok(0);
        }

        sqlx::query(
            r#"
            UPDATE categories AS c
            SET full_slug = u.full_slug, updated_at = NOW()
            FROM UNNEST($1::BIGINT[], $2::TEXT[]) AS u(id, full_slug)
            WHERE c.id = u.id
            "#,
        )
        .bind(&ids)
        .bind(&paths)
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to rewrite descendant paths"))?;

        Ok(ids.len())
    }
}

#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::shared::test_helpers::test_directory_config;

    fn service(pool: PgPool) -> CategoryService {
        CategoryService::new(pool, &test_directory_config())
    }

    fn category(name: &str, parent_id: Option<i64>) -> CreateCategoryDto {
        CreateCategoryDto {
            name: name.to_string(),
            slug: None,
            parent_id,
            description: None,
            icon: None,
            color: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_rename_rewrites_descendant_paths(pool: PgPool) {
        let service = service(pool);
        let a = service.create(category("A", None)).await.unwrap();
        let b = service.create(category("B", Some(a.id))).await.unwrap();
        let c = service.create(category("C", Some(b.id))).await.unwrap();
        let d = service.create(category("D", Some(c.id))).await.unwrap();
        assert_eq!(d.full_slug, "A/B/C/D");

        let renamed = service
            .update(
                b.id,
                UpdateCategoryDto {
                    slug: Some("B2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(renamed.full_slug, "A/B2");
        assert_eq!(service.get(c.id).await.unwrap().full_slug, "A/B2/C");
        assert_eq!(service.get(d.id).await.unwrap().full_slug, "A/B2/C/D");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_sibling_slugs_are_suffixed(pool: PgPool) {
        let service = service(pool);
        let root = service.create(category("Lawyers", None)).await.unwrap();
        let first = service.create(category("Family", Some(root.id))).await.unwrap();
        let second = service.create(category("Family", Some(root.id))).await.unwrap();
        let elsewhere = service.create(category("Family", None)).await.unwrap();

        assert_eq!(first.slug, "Family");
        assert_eq!(second.slug, "Family_2");
        assert_eq!(second.full_slug, "Lawyers/Family_2");
        assert_eq!(elsewhere.full_slug, "Family");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_reparent_under_descendant_is_rejected(pool: PgPool) {
        let service = service(pool);
        let a = service.create(category("A", None)).await.unwrap();
        let b = service.create(category("B", Some(a.id))).await.unwrap();

        let err = service
            .update(
                a.id,
                UpdateCategoryDto {
                    parent_id: Some(Some(b.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let self_parent = service
            .update(
                a.id,
                UpdateCategoryDto {
                    parent_id: Some(Some(a.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(self_parent, AppError::Validation(_)));

        assert_eq!(service.get(a.id).await.unwrap().parent_id, None);
        assert_eq!(service.get(b.id).await.unwrap().full_slug, "A/B");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_delete_protects_children(pool: PgPool) {
        let service = service(pool);
        let a = service.create(category("A", None)).await.unwrap();
        service.create(category("B", Some(a.id))).await.unwrap();

        assert!(matches!(
            service.delete(a.id).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_recalc_counts_is_idempotent(pool: PgPool) {
        let service = service(pool.clone());
        let a = service.create(category("A", None)).await.unwrap();
        sqlx::query(
            "INSERT INTO businesses (name, slug, status, category_id) VALUES \
             ('One', 'one', 'active', $1), ('Two', 'two', 'pending', $1)",
        )
        .bind(a.id)
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO providers (provider_name, slug, status, category_id) \
             VALUES ('Doc', 'doc', 'active', $1)",
        )
        .bind(a.id)
        .execute(&pool)
        .await
        .unwrap();

        assert_eq!(service.recalc_listing_counts(None).await.unwrap(), 1);
        assert_eq!(service.recalc_listing_counts(None).await.unwrap(), 0);
        assert_eq!(service.get(a.id).await.unwrap().business_count, 2);
        assert_eq!(service.listing_count(a.id).await.unwrap(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_child_created_during_parent_rename_gets_new_path(pool: PgPool) {
        let a = service(pool.clone()).create(category("A", None)).await.unwrap();

        let mut rename = pool.begin().await.unwrap();
        sqlx::query("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
            .bind(a.id)
            .execute(&mut *rename)
            .await
            .unwrap();
        sqlx::query("UPDATE categories SET slug = 'A2', full_slug = 'A2' WHERE id = $1")
            .bind(a.id)
            .execute(&mut *rename)
            .await
            .unwrap();

        let creator = service(pool.clone());
        let child = tokio::spawn(async move { creator.create(category("Kid", Some(a.id))).await });
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        rename.commit().await.unwrap();

        let child = child.await.unwrap().unwrap();
        assert_eq!(child.full_slug, "A2/Kid");
    }
}
