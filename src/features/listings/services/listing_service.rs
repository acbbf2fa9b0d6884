use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::config::DirectoryConfig;
use crate::core::database::db_error;
use crate::core::error::{AppError, Result};
use crate::features::categories::ListingCountTrigger;
use crate::features::listings::claim::{compose_claim_note, ClaimDecision};
use crate::features::listings::columns::{push_assignments, Column};
use crate::features::listings::dtos::{ClaimRequest, ListListingsQuery};
use crate::features::listings::listing::{Listing, ListingDraft, ListingPatch, OwnerEdit};
use crate::features::listings::models::ListingStatus;
use crate::shared::constants::FEATURED_LIMIT;
use crate::shared::slug::{disambiguate, slugify_or};
use crate::shared::sql::{contains_pattern, like_escape, prefix_pattern};
use crate::shared::types::resolve_page;

/// Service for one listing table; `T` picks businesses or providers
pub struct ListingService<T: Listing> {
    pub(super) pool: PgPool,
    pub(super) counts: Arc<dyn ListingCountTrigger>,
    pub(super) chunk_size: usize,
    pub(super) import_lock_key: i64,
    default_limit: i64,
    max_limit: i64,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Listing> ListingService<T> {
    pub fn new(
        pool: PgPool,
        counts: Arc<dyn ListingCountTrigger>,
        config: &DirectoryConfig,
    ) -> Self {
        Self {
            pool,
            counts,
            chunk_size: config.bulk_chunk_size.max(1),
            import_lock_key: config.bulk_import_lock_key,
            default_limit: config.search_default_limit,
            max_limit: config.search_max_limit,
            _kind: PhantomData,
        }
    }

    pub(super) fn table() -> &'static str {
        T::KIND.table()
    }

    fn not_found(what: impl std::fmt::Display) -> AppError {
        AppError::NotFound(format!("{} {} not found", T::KIND, what))
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub async fn find(&self, id: i64) -> Result<Option<T>> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", Self::table());
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get listing"))
    }

    pub async fn get(&self, id: i64) -> Result<T> {
        self.find(id).await?.ok_or_else(|| Self::not_found(id))
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<T>> {
        let sql = format!("SELECT * FROM {} WHERE slug = $1", Self::table());
        sqlx::query_as::<_, T>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get listing by slug"))
    }

    /// Resolve `category path + listing slug`, tolerating stale or partial paths:
    /// exact path, case-insensitive path, path as an ancestor prefix, then the
    /// path's last segment as a sibling slug.
    pub async fn find_by_path(&self, category_path: &str, slug: &str) -> Result<Option<T>> {
        let path = category_path.trim_matches('/');
        let last_segment = path.rsplit('/').next().unwrap_or(path);
        let table = Self::table();

        let attempts = [
            (
                format!(
                    "SELECT l.* FROM {} l JOIN categories c ON c.id = l.category_id \
                     WHERE l.slug = $1 AND c.full_slug = $2 LIMIT 1",
                    table
                ),
                path.to_string(),
            ),
            (
                format!(
                    "SELECT l.* FROM {} l JOIN categories c ON c.id = l.category_id \
                     WHERE l.slug = $1 AND c.full_slug ILIKE $2 ESCAPE '\\' \
                     ORDER BY c.full_slug LIMIT 1",
                    table
                ),
                like_escape(path),
            ),
            (
                format!(
                    "SELECT l.* FROM {} l JOIN categories c ON c.id = l.category_id \
                     WHERE l.slug = $1 AND c.full_slug ILIKE $2 ESCAPE '\\' \
                     ORDER BY c.full_slug LIMIT 1",
                    table
                ),
                prefix_pattern(path),
            ),
            (
                format!(
                    "SELECT l.* FROM {} l JOIN categories c ON c.id = l.category_id \
                     WHERE l.slug = $1 AND c.slug = $2 ORDER BY c.full_slug LIMIT 1",
                    table
                ),
                last_segment.to_string(),
            ),
        ];

        for (sql, value) in attempts {
            let found = sqlx::query_as::<_, T>(&sql)
                .bind(slug)
                .bind(value)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to resolve listing by path"))?;
            if found.is_some() {
                return Ok(found);
            }
        }

        Ok(None)
    }

    /// Top active listings by rating
    pub async fn featured(&self) -> Result<Vec<T>> {
        let sql = format!(
            "SELECT * FROM {} WHERE status = 'active' \
             ORDER BY average_rating DESC, updated_at DESC, id DESC LIMIT $1",
            Self::table()
        );
        sqlx::query_as::<_, T>(&sql)
            .bind(FEATURED_LIMIT)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list featured listings"))
    }

    /// Filtered page, newest first, plus the total match count
    pub async fn list(&self, query: &ListListingsQuery) -> Result<(Vec<T>, i64)> {
        let (limit, offset) =
            resolve_page(query.limit, query.offset, self.default_limit, self.max_limit)?;

        let mut count = QueryBuilder::<Postgres>::new(format!(
            "SELECT COUNT(*) FROM {} l LEFT JOIN categories c ON c.id = l.category_id WHERE TRUE",
            Self::table()
        ));
        Self::push_list_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count listings"))?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT l.* FROM {} l LEFT JOIN categories c ON c.id = l.category_id WHERE TRUE",
            Self::table()
        ));
        Self::push_list_filters(&mut select, query);
        select
            .push(" ORDER BY l.updated_at DESC, l.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let items = select
            .build_query_as::<T>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list listings"))?;

        Ok((items, total))
    }

    fn push_list_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ListListingsQuery) {
        if let Some(status) = query.status {
            qb.push(" AND l.status = ").push_bind(status);
        }
        if let Some(category_id) = query.category_id {
            qb.push(" AND l.category_id = ").push_bind(category_id);
        }
        if let Some(path) = non_blank(&query.category_path) {
            qb.push(" AND c.full_slug LIKE ")
                .push_bind(prefix_pattern(path))
                .push(" ESCAPE '\\'");
        }
        if let Some(city) = non_blank(&query.city) {
            qb.push(" AND LOWER(l.city) = LOWER(").push_bind(city.to_string()).push(")");
        }
        if let Some(state) = non_blank(&query.state) {
            qb.push(" AND LOWER(l.state) = LOWER(").push_bind(state.to_string()).push(")");
        }
        if let Some(is_premium) = query.is_premium {
            qb.push(" AND l.is_premium = ").push_bind(is_premium);
        }
        if let Some(owner) = non_blank(&query.claimed_by) {
            qb.push(" AND l.claimed_by = ").push_bind(owner.to_string());
        }
        if let Some(claimant) = non_blank(&query.pending_claim_by) {
            qb.push(" AND l.pending_claim_by = ").push_bind(claimant.to_string());
        }
        if let Some(q) = non_blank(&query.q) {
            let pattern = contains_pattern(q);
            let columns = [
                T::KIND.name_column(),
                T::KIND.secondary_column(),
                "description",
                "city",
                "state",
                "zip",
            ];
            qb.push(" AND (");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(format!("l.{} ILIKE ", column))
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\'");
            }
            qb.push(")");
        }
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Submit a listing; it starts `pending` with a unique slug derived from its name
    pub async fn create(&self, draft: T::Draft) -> Result<T> {
        if let Some(category_id) = draft.category_id() {
            self.ensure_categories_exist(&[category_id]).await?;
        }
        let base = slugify_or(draft.display_name(), T::KIND.slug_fallback());
        let slug = self.free_slug(&base).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("INSERT INTO {} (", Self::table()));
        let columns = draft.columns();
        {
            let mut names = qb.separated(", ");
            for (name, _) in &columns {
                names.push(*name);
            }
            names.push("slug");
            names.push("status");
        }
        qb.push(") VALUES (");
        {
            let mut values = qb.separated(", ");
            for (_, value) in columns {
                value.bind_separated(&mut values);
            }
            values.push_bind(slug);
            values.push_bind(ListingStatus::Pending);
        }
        qb.push(") RETURNING *");

        let listing = qb
            .build_query_as::<T>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to create listing"))?;

        tracing::info!(kind = %T::KIND, id = listing.id(), slug = listing.slug(), "Listing created");
        self.counts.listings_changed(&[listing.category_id()]).await;
        Ok(listing)
    }

    /// Admin edit. Status flips and recategorization recount both categories.
    pub async fn update(&self, id: i64, patch: T::Patch) -> Result<T> {
        let current = self.get(id).await?;
        if let Some(Some(category_id)) = patch.category_id() {
            self.ensure_categories_exist(&[category_id]).await?;
        }

        let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET", Self::table()));
        if push_assignments(&mut qb, patch.columns()) {
            qb.push(", updated_at = NOW()");
        } else {
            qb.push(" updated_at = NOW()");
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        let updated = qb
            .build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to update listing"))?
            .ok_or_else(|| Self::not_found(id))?;

        let category_changed = patch
            .category_id()
            .is_some_and(|category_id| category_id != current.category_id());
        let status_changed = patch
            .status()
            .is_some_and(|status| status != current.status());
        if category_changed || status_changed {
            self.counts
                .listings_changed(&[current.category_id(), updated.category_id()])
                .await;
        }

        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1 RETURNING category_id", Self::table());
        let category_id = sqlx::query_scalar::<_, Option<i64>>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to delete listing"))?
            .ok_or_else(|| Self::not_found(id))?;

        tracing::info!(kind = %T::KIND, id, "Listing deleted");
        self.counts.listings_changed(&[category_id]).await;
        Ok(())
    }

    // =========================================================================
    // CLAIMS
    // =========================================================================

    /// Request ownership, applying any owner-editable fields in the same statement.
    /// Guarded so a concurrent claim by someone else cannot slip in.
    pub async fn claim(
        &self,
        id: i64,
        actor: &str,
        request: &ClaimRequest<T::Edits>,
    ) -> Result<T> {
        let note = compose_claim_note(
            request.claim.relationship.as_deref(),
            request.claim.verification_notes.as_deref(),
        );
        let mut qb = Self::claim_query(id, actor, note, request.edits.columns());
        let claimed = qb
            .build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to claim listing"))?;

        match claimed {
            Some(listing) => {
                tracing::info!(kind = %T::KIND, id, actor, "Claim requested");
                Ok(listing)
            }
            None => {
                let current = self.get(id).await?;
                current.claim_state().ensure_claimable_by(actor)?;
                Err(AppError::Conflict(
                    "Claim state changed concurrently; please retry.".to_string(),
                ))
            }
        }
    }

    fn claim_query(
        id: i64,
        actor: &str,
        note: Option<String>,
        edits: Vec<Column>,
    ) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {} SET updated_at = NOW(), pending_claim_requested_at = NOW(), pending_claim_by = ",
            Self::table()
        ));
        qb.push_bind(actor.to_string());
        if let Some(note) = note {
            qb.push(
                ", pending_claim_notes = CASE WHEN pending_claim_notes IS NULL OR pending_claim_notes = '' THEN ",
            )
            .push_bind(note.clone())
            .push(" ELSE pending_claim_notes || E'\\n' || ")
            .push_bind(note)
            .push(" END");
        }
        if !edits.is_empty() {
            qb.push(",");
            push_assignments(&mut qb, edits);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND (claimed_by IS NULL OR claimed_by = ")
            .push_bind(actor.to_string())
            .push(") AND (pending_claim_by IS NULL OR pending_claim_by = ")
            .push_bind(actor.to_string())
            .push(") RETURNING *");
        qb
    }

    /// Admin: the pending claimant becomes the owner
    pub async fn approve_claim(&self, id: i64) -> Result<T> {
        let sql = format!(
            r#"
            UPDATE {}
            SET claimed_by = pending_claim_by,
                claimed_at = NOW(),
                pending_claim_by = NULL,
                pending_claim_notes = NULL,
                pending_claim_requested_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND pending_claim_by IS NOT NULL
            RETURNING *
            "#,
            Self::table()
        );
        let approved = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to approve claim"))?;

        self.decided(id, approved, ClaimDecision::Approve).await
    }

    /// Admin: drop the pending claim, optionally leaving a note
    pub async fn reject_claim(&self, id: i64, note: Option<&str>) -> Result<T> {
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        let sql = format!(
            r#"
            UPDATE {}
            SET pending_claim_by = NULL,
                pending_claim_requested_at = NULL,
                pending_claim_notes = COALESCE($2, pending_claim_notes),
                updated_at = NOW()
            WHERE id = $1 AND pending_claim_by IS NOT NULL
            RETURNING *
            "#,
            Self::table()
        );
        let rejected = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .bind(note)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to reject claim"))?;

        self.decided(id, rejected, ClaimDecision::Reject).await
    }

    async fn decided(&self, id: i64, row: Option<T>, decision: ClaimDecision) -> Result<T> {
        match row {
            Some(listing) => {
                tracing::info!(kind = %T::KIND, id, ?decision, "Claim decided");
                Ok(listing)
            }
            None => {
                let current = self.get(id).await?;
                current.claim_state().ensure_pending(decision)?;
                Err(AppError::Conflict(
                    "Claim state changed concurrently; please retry.".to_string(),
                ))
            }
        }
    }

    /// Admin: assign (or clear) the owner directly; any pending claim is discarded
    pub async fn set_owner(&self, id: i64, user_id: Option<&str>) -> Result<T> {
        let user_id = user_id.map(str::trim).filter(|u| !u.is_empty() && *u != "null");
        let sql = format!(
            r#"
            UPDATE {}
            SET claimed_by = $2,
                claimed_at = CASE WHEN $2::TEXT IS NULL THEN NULL ELSE NOW() END,
                pending_claim_by = NULL,
                pending_claim_notes = NULL,
                pending_claim_requested_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
            Self::table()
        );
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to set listing owner"))?
            .ok_or_else(|| Self::not_found(id))
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Unknown category ids are a client error, not a foreign-key conflict
    pub(super) async fn ensure_categories_exist(&self, ids: &[i64]) -> Result<()> {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        if wanted.is_empty() {
            return Ok(());
        }
        let wanted: Vec<i64> = wanted.into_iter().collect();
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM categories WHERE id = ANY($1)",
        )
        .bind(&wanted)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check categories"))?;

        if found as usize != wanted.len() {
            return Err(AppError::Validation("Invalid category_id.".to_string()));
        }
        Ok(())
    }

    /// First of `base`, `base-1`, `base-2`, ... unused in this table
    async fn free_slug(&self, base: &str) -> Result<String> {
        let sql = format!(
            "SELECT slug FROM {} WHERE slug = $1 OR slug LIKE $2 ESCAPE '\\'",
            Self::table()
        );
        let taken: HashSet<String> = sqlx::query_scalar::<_, String>(&sql)
            .bind(base)
            .bind(format!("{}-%", like_escape(base)))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to load existing slugs"))?
            .into_iter()
            .collect();

        Ok(disambiguate(base, '-', 1, |candidate| taken.contains(candidate)))
    }
}

pub(super) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::listings::columns::ColumnValue;
    use crate::features::listings::models::{Business, Provider};

    fn sql_for<T: Listing>(query: &ListListingsQuery) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        ListingService::<T>::push_list_filters(&mut qb, query);
        qb.sql().to_string()
    }

    #[test]
    fn test_list_filters_use_kind_columns() {
        let query = ListListingsQuery {
            q: Some("smith".to_string()),
            ..Default::default()
        };
        assert!(sql_for::<Business>(&query).contains("l.practice_areas ILIKE"));
        assert!(sql_for::<Provider>(&query).contains("l.provider_name ILIKE"));
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let query = ListListingsQuery {
            q: Some("  ".to_string()),
            city: Some("".to_string()),
            ..Default::default()
        };
        assert_eq!(sql_for::<Business>(&query), "SELECT 1 WHERE TRUE");
    }

    #[test]
    fn test_structured_filters() {
        let query = ListListingsQuery {
            status: Some(ListingStatus::Active),
            category_path: Some("Lawyers".to_string()),
            state: Some("tx".to_string()),
            ..Default::default()
        };
        let sql = sql_for::<Business>(&query);
        assert!(sql.contains("l.status = $1"));
        assert!(sql.contains("c.full_slug LIKE $2 ESCAPE"));
        assert!(sql.contains("LOWER(l.state) = LOWER($3)"));
    }

    #[test]
    fn test_claim_query_keeps_guard_with_edits() {
        let edits = vec![("honors", ColumnValue::Text(Some("Top 40".to_string())))];
        let qb = ListingService::<Business>::claim_query(7, "alice", None, edits);
        assert_eq!(
            qb.sql(),
            "UPDATE businesses SET updated_at = NOW(), pending_claim_requested_at = NOW(), \
             pending_claim_by = $1, honors = $2 WHERE id = $3 \
             AND (claimed_by IS NULL OR claimed_by = $4) \
             AND (pending_claim_by IS NULL OR pending_claim_by = $5) RETURNING *"
        );
    }

    #[test]
    fn test_claim_query_appends_note() {
        let qb = ListingService::<Provider>::claim_query(
            7,
            "alice",
            Some("Relationship: Owner".to_string()),
            Vec::new(),
        );
        let sql = qb.sql();
        assert!(sql.starts_with("UPDATE providers SET"));
        assert!(sql.contains("ELSE pending_claim_notes || E'\\n' || $3 END WHERE id = $4"));
    }
}

#[cfg(test)]
mod db_tests {
    use serde_json::json;

    use super::*;
    use crate::features::categories::dtos::CreateCategoryDto;
    use crate::features::categories::CategoryService;
    use crate::features::listings::dtos::{BusinessOwnerEditDto, CreateBusinessDto, UpdateBusinessDto};
    use crate::features::listings::models::Business;
    use crate::shared::test_helpers::test_directory_config;

    fn service(pool: PgPool) -> ListingService<Business> {
        let config = test_directory_config();
        let counts: Arc<dyn ListingCountTrigger> =
            Arc::new(CategoryService::new(pool.clone(), &config));
        ListingService::new(pool, counts, &config)
    }

    fn draft(name: &str) -> CreateBusinessDto {
        serde_json::from_value(json!({ "name": name })).unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_create_disambiguates_slug(pool: PgPool) {
        let service = service(pool);
        let first = service.create(draft("Smith & Associates")).await.unwrap();
        let second = service.create(draft("Smith & Associates")).await.unwrap();

        assert_eq!(first.slug, "smith-associates");
        assert_eq!(second.slug, "smith-associates-1");
        assert_eq!(first.status, ListingStatus::Pending);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_second_claimant_conflicts(pool: PgPool) {
        let service = service(pool);
        let listing = service.create(draft("Acme Law")).await.unwrap();

        let claimed = service
            .claim(listing.id, "alice", &ClaimRequest::default())
            .await
            .unwrap();
        assert_eq!(claimed.pending_claim_by.as_deref(), Some("alice"));

        let err = service
            .claim(listing.id, "bob", &ClaimRequest::default())
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Conflict(ref m) if m == "Another claim is already pending review.")
        );

        let approved = service.approve_claim(listing.id).await.unwrap();
        assert_eq!(approved.claimed_by.as_deref(), Some("alice"));
        assert_eq!(approved.pending_claim_by, None);

        assert!(matches!(
            service.reject_claim(listing.id, None).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_set_owner_null_clears(pool: PgPool) {
        let service = service(pool);
        let listing = service.create(draft("Acme Law")).await.unwrap();

        let owned = service.set_owner(listing.id, Some("carol")).await.unwrap();
        assert_eq!(owned.claimed_by.as_deref(), Some("carol"));

        let cleared = service.set_owner(listing.id, Some("null")).await.unwrap();
        assert_eq!(cleared.claimed_by, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_claim_applies_owner_edits(pool: PgPool) {
        let service = service(pool);
        let listing = service.create(draft("Acme Law")).await.unwrap();

        let request: ClaimRequest<BusinessOwnerEditDto> = serde_json::from_value(json!({
            "relationship": "Owner",
            "website": "example.com",
            "honors": "Super Lawyers 2024",
        }))
        .unwrap();
        let claimed = service.claim(listing.id, "alice", &request).await.unwrap();

        assert_eq!(claimed.pending_claim_by.as_deref(), Some("alice"));
        assert_eq!(claimed.website.as_deref(), Some("https://example.com"));
        assert_eq!(claimed.honors.as_deref(), Some("Super Lawyers 2024"));
        assert_eq!(claimed.pending_claim_notes.as_deref(), Some("Relationship: Owner"));

        let rival: ClaimRequest<BusinessOwnerEditDto> =
            serde_json::from_value(json!({ "website": "rival.example" })).unwrap();
        assert!(matches!(
            service.claim(listing.id, "bob", &rival).await,
            Err(AppError::Conflict(_))
        ));
        let current = service.get(listing.id).await.unwrap();
        assert_eq!(current.website.as_deref(), Some("https://example.com"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_unknown_category_rejected(pool: PgPool) {
        let service = service(pool);
        let orphan: CreateBusinessDto =
            serde_json::from_value(json!({ "name": "Acme Law", "category_id": 999_999 })).unwrap();
        assert!(matches!(
            service.create(orphan).await,
            Err(AppError::Validation(_))
        ));

        let listing = service.create(draft("Acme Law")).await.unwrap();
        let patch: UpdateBusinessDto =
            serde_json::from_value(json!({ "category_id": 999_999 })).unwrap();
        assert!(matches!(
            service.update(listing.id, patch).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(service.get(listing.id).await.unwrap().category_id, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_counts_follow_status_and_recategorize(pool: PgPool) {
        let categories = CategoryService::new(pool.clone(), &test_directory_config());
        let service = service(pool);
        let new_category = |name: &str| -> CreateCategoryDto {
            serde_json::from_value(json!({ "name": name })).unwrap()
        };
        let a = categories.create(new_category("Lawyers")).await.unwrap();
        let b = categories.create(new_category("Doctors")).await.unwrap();

        let filed: CreateBusinessDto =
            serde_json::from_value(json!({ "name": "Acme Law", "category_id": a.id })).unwrap();
        let listing = service.create(filed).await.unwrap();
        assert_eq!(categories.listing_count(a.id).await.unwrap(), 0);

        let activate: UpdateBusinessDto =
            serde_json::from_value(json!({ "status": "active" })).unwrap();
        service.update(listing.id, activate).await.unwrap();
        assert_eq!(categories.listing_count(a.id).await.unwrap(), 1);
        assert_eq!(categories.get(a.id).await.unwrap().business_count, 1);

        let moved: UpdateBusinessDto =
            serde_json::from_value(json!({ "category_id": b.id })).unwrap();
        service.update(listing.id, moved).await.unwrap();
        assert_eq!(categories.get(a.id).await.unwrap().business_count, 0);
        assert_eq!(categories.get(b.id).await.unwrap().business_count, 1);

        service.delete(listing.id).await.unwrap();
        assert_eq!(categories.listing_count(b.id).await.unwrap(), 0);
        assert_eq!(categories.get(b.id).await.unwrap().business_count, 0);
    }
}
