//! Admin bulk operations: category reassignment and serialized imports.

use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use sqlx::{PgConnection, Postgres, QueryBuilder};
use validator::Validate;

use super::listing_service::{non_blank, ListingService};
use crate::core::database::db_error;
use crate::core::error::{AppError, Result};
use crate::features::categories::tree::PATH_SEPARATOR;
use crate::features::listings::columns::ColumnValue;
use crate::features::listings::dtos::{
    BulkCreateDto, BulkCreateResultDto, BulkSetCategoryDto, BulkSetCategoryResultDto,
};
use crate::features::listings::listing::{Listing, ListingDraft};
use crate::features::listings::models::ListingStatus;
use crate::shared::slug::import_slug;

/// Postgres caps a statement at 65535 bind parameters
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

fn root_segment(full_slug: &str) -> &str {
    full_slug.split(PATH_SEPARATOR).next().unwrap_or(full_slug)
}

/// Moves may only land on a subcategory, never on a main (root) category
pub fn ensure_subcategory(destination_full_slug: &str) -> Result<()> {
    if !destination_full_slug.contains(PATH_SEPARATOR) {
        return Err(AppError::BadRequest(
            "Destination must be a subcategory (no main→main allowed).".to_string(),
        ));
    }
    Ok(())
}

/// The main category shared by every source and the destination
pub fn shared_main_category<'a, I>(destination_full_slug: &str, sources: I) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let roots: BTreeSet<&str> = sources
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(root_segment)
        .collect();

    let mut roots = roots.into_iter();
    let root = match (roots.next(), roots.next()) {
        (None, _) => {
            return Err(AppError::BadRequest(
                "Selected listings have no valid category; cannot determine main category."
                    .to_string(),
            ))
        }
        (Some(_), Some(_)) => {
            return Err(AppError::BadRequest(
                "Selected listings span multiple main categories. Split your selection and retry."
                    .to_string(),
            ))
        }
        (Some(root), None) => root,
    };

    if root_segment(destination_full_slug) != root {
        return Err(AppError::BadRequest(
            "Destination subcategory is under a different main category. This move is not allowed."
                .to_string(),
        ));
    }

    Ok(root.to_string())
}

/// Rows per INSERT so that `rows * params_per_row` stays under the bind limit
fn rows_per_batch(chunk_size: usize, params_per_row: usize) -> usize {
    chunk_size
        .min(MAX_BIND_PARAMS / params_per_row.max(1))
        .max(1)
}

impl<T: Listing> ListingService<T> {
    /// Move a selection of listings into one subcategory of the same main category
    pub async fn bulk_set_category(
        &self,
        dto: &BulkSetCategoryDto,
    ) -> Result<BulkSetCategoryResultDto> {
        let ids = dto.ids.as_deref().filter(|ids| !ids.is_empty());
        if ids.is_none() && dto.from_category_id.is_none() {
            return Err(AppError::BadRequest(
                "Provide ids or from_category_id.".to_string(),
            ));
        }

        let destination = sqlx::query_scalar::<_, String>(
            "SELECT full_slug FROM categories WHERE id = $1",
        )
        .bind(dto.to_category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to load destination category"))?
        .ok_or_else(|| AppError::BadRequest("Invalid to_category_id.".to_string()))?;
        ensure_subcategory(&destination)?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT id, category_id FROM {} WHERE TRUE",
            Self::table()
        ));
        Self::push_selection(&mut select, ids, dto);
        let selected = select
            .build_query_as::<(i64, Option<i64>)>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to select listings for bulk move"))?;

        let mut result = BulkSetCategoryResultDto {
            dry_run: dto.dry_run,
            count: selected.len(),
            moved: 0,
            to_category_id: dto.to_category_id,
            from_category_id: dto.from_category_id,
            main_category: None,
        };
        if selected.is_empty() {
            return Ok(result);
        }

        let source_ids: Vec<i64> = selected
            .iter()
            .filter_map(|(_, category_id)| *category_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let source_paths = sqlx::query_scalar::<_, String>(
            "SELECT full_slug FROM categories WHERE id = ANY($1)",
        )
        .bind(&source_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load source categories"))?;

        result.main_category = Some(shared_main_category(
            &destination,
            source_paths.iter().map(String::as_str),
        )?);
        if dto.dry_run {
            return Ok(result);
        }

        let listing_ids: Vec<i64> = selected.iter().map(|(id, _)| *id).collect();
        let sql = format!(
            "UPDATE {} SET category_id = $1, updated_at = NOW() WHERE id = ANY($2)",
            Self::table()
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;
        for chunk in listing_ids.chunks(self.chunk_size) {
            result.moved += sqlx::query(&sql)
                .bind(dto.to_category_id)
                .bind(chunk)
                .execute(&mut *tx)
                .await
                .map_err(db_error("Failed to move listings"))?
                .rows_affected();
        }
        tx.commit()
            .await
            .map_err(db_error("Failed to commit bulk move"))?;

        tracing::info!(
            kind = %T::KIND,
            moved = result.moved,
            to = dto.to_category_id,
            "Bulk category move complete"
        );

        let mut affected: Vec<Option<i64>> = source_ids.into_iter().map(Some).collect();
        affected.push(Some(dto.to_category_id));
        self.counts.listings_changed(&affected).await;

        Ok(result)
    }

    fn push_selection(
        qb: &mut QueryBuilder<'_, Postgres>,
        ids: Option<&[i64]>,
        dto: &BulkSetCategoryDto,
    ) {
        if let Some(ids) = ids {
            qb.push(" AND id = ANY(").push_bind(ids.to_vec()).push(")");
        }
        if let Some(from) = dto.from_category_id {
            qb.push(" AND category_id = ").push_bind(from);
        }
        if let Some(status) = dto.filters.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(city) = non_blank(&dto.filters.city) {
            qb.push(" AND LOWER(city) = LOWER(").push_bind(city.to_string()).push(")");
        }
        if let Some(state) = non_blank(&dto.filters.state) {
            qb.push(" AND LOWER(state) = LOWER(").push_bind(state.to_string()).push(")");
        }
    }

    /// Import many listings at once. Only one import runs at a time across the
    /// whole deployment; a concurrent caller gets `Conflict` immediately.
    ///
    /// The lock is transaction-scoped, so commit, rollback or a dropped
    /// connection (cancelled request) all release it.
    pub async fn bulk_create(&self, dto: BulkCreateDto<T::Draft>) -> Result<BulkCreateResultDto> {
        if dto.items.is_empty() {
            return Ok(BulkCreateResultDto { created: 0 });
        }

        let started = Instant::now();
        for (i, item) in dto.items.iter().enumerate() {
            item.validate()
                .map_err(|e| AppError::Validation(format!("items[{}]: {}", i, e)))?;
        }
        let categories: Vec<Option<i64>> = dto
            .items
            .iter()
            .map(|item| item.category_id())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let known: Vec<i64> = categories.iter().flatten().copied().collect();
        self.ensure_categories_exist(&known).await?;
        let validated_at = started.elapsed();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin import transaction"))?;

        let locked = sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_xact_lock($1)")
            .bind(self.import_lock_key)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to take import lock"))?;
        if !locked {
            return Err(AppError::Conflict(
                "Another bulk import is currently running. Try again later.".to_string(),
            ));
        }

        let item_count = dto.items.len();
        let status = dto.status.unwrap_or(ListingStatus::Pending);

        let created = self.insert_batches(&mut *tx, dto.items, status).await?;
        tx.commit()
            .await
            .map_err(db_error("Failed to commit import"))?;

        tracing::info!(
            kind = %T::KIND,
            items = item_count,
            created,
            validate_ms = validated_at.as_millis() as u64,
            total_ms = started.elapsed().as_millis() as u64,
            "Bulk import complete"
        );

        if created > 0 {
            self.counts.listings_changed(&categories).await;
        }
        Ok(BulkCreateResultDto { created })
    }

    async fn insert_batches(
        &self,
        conn: &mut PgConnection,
        items: Vec<T::Draft>,
        status: ListingStatus,
    ) -> Result<u64> {
        let fallback = T::KIND.slug_fallback();
        let mut names: Vec<&'static str> = Vec::new();
        let mut rows: Vec<(Vec<ColumnValue>, String)> = Vec::with_capacity(items.len());
        for item in &items {
            let columns = item.columns();
            if names.is_empty() {
                names = columns.iter().map(|(name, _)| *name).collect();
            }
            let slug = import_slug(item.display_name(), fallback);
            rows.push((columns.into_iter().map(|(_, value)| value).collect(), slug));
        }

        let batch = rows_per_batch(self.chunk_size, names.len() + 2);
        let head = format!("INSERT INTO {} ({}, slug, status) ", Self::table(), names.join(", "));

        let mut created = 0;
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let mut qb = QueryBuilder::<Postgres>::new(&head);
            qb.push_values(rows.by_ref().take(batch), |mut row, (values, slug)| {
                for value in values {
                    value.bind_separated(&mut row);
                }
                row.push_bind(slug).push_bind(status);
            });
            qb.push(" ON CONFLICT (slug) DO NOTHING");

            created += qb
                .build()
                .execute(&mut *conn)
                .await
                .map_err(db_error("Failed to insert import batch"))?
                .rows_affected();
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::listings::dtos::BulkFilters;
    use crate::features::listings::models::Business;

    #[test]
    fn test_destination_must_be_subcategory() {
        assert!(matches!(
            ensure_subcategory("Lawyers"),
            Err(AppError::BadRequest(ref m)) if m.starts_with("Destination must be a subcategory")
        ));
        assert!(ensure_subcategory("Lawyers/Family").is_ok());
    }

    #[test]
    fn test_shared_main_category() {
        let main = shared_main_category(
            "Lawyers/Family",
            ["Lawyers", "Lawyers/Criminal", "Lawyers/Criminal/DUI"],
        )
        .unwrap();
        assert_eq!(main, "Lawyers");
    }

    #[test]
    fn test_sources_without_category() {
        let err = shared_main_category("Lawyers/Family", Vec::<&str>::new()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("no valid category")));
    }

    #[test]
    fn test_sources_across_main_categories() {
        let err = shared_main_category("Lawyers/Family", ["Lawyers/Tax", "Doctors/Dental"])
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("span multiple")));
    }

    #[test]
    fn test_destination_under_other_main() {
        let err = shared_main_category("Doctors/Dental", ["Lawyers/Tax"]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("different main category")));
    }

    #[test]
    fn test_rows_per_batch_respects_bind_limit() {
        assert_eq!(rows_per_batch(5000, 17), 3855);
        assert_eq!(rows_per_batch(100, 17), 100);
        assert_eq!(rows_per_batch(0, 17), 1);
    }

    #[test]
    fn test_selection_sql() {
        let dto = BulkSetCategoryDto {
            ids: Some(vec![1, 2]),
            from_category_id: Some(4),
            to_category_id: 9,
            filters: BulkFilters {
                status: Some(ListingStatus::Active),
                city: Some(" ".to_string()),
                state: Some("TX".to_string()),
            },
            dry_run: true,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM businesses WHERE TRUE");
        ListingService::<Business>::push_selection(&mut qb, dto.ids.as_deref(), &dto);
        assert_eq!(
            qb.sql(),
            "SELECT id FROM businesses WHERE TRUE AND id = ANY($1) AND category_id = $2 \
             AND status = $3 AND LOWER(state) = LOWER($4)"
        );
    }
}

#[cfg(test)]
mod db_tests {
    use std::sync::Arc;

    use sqlx::PgPool;

    use super::*;
    use crate::features::categories::{CategoryService, ListingCountTrigger};
    use crate::features::listings::dtos::CreateBusinessDto;
    use crate::features::listings::models::Business;
    use crate::shared::test_helpers::test_directory_config;

    fn service(pool: PgPool) -> ListingService<Business> {
        let config = test_directory_config();
        let counts: Arc<dyn ListingCountTrigger> =
            Arc::new(CategoryService::new(pool.clone(), &config));
        ListingService::new(pool, counts, &config)
    }

    fn items(names: &[&str]) -> Vec<CreateBusinessDto> {
        names
            .iter()
            .map(|name| serde_json::from_value(serde_json::json!({ "name": name })).unwrap())
            .collect()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_bulk_create_spans_batches(pool: PgPool) {
        let service = service(pool.clone());
        let result = service
            .bulk_create(BulkCreateDto {
                items: items(&["One", "Two", "Three"]),
                status: Some(ListingStatus::Active),
            })
            .await
            .unwrap();
        assert_eq!(result.created, 3);

        let active: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM businesses WHERE status = 'active'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(active, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_bulk_create_refuses_while_locked(pool: PgPool) {
        let service = service(pool.clone());
        let mut holder = pool.acquire().await.unwrap();
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(test_directory_config().bulk_import_lock_key)
            .execute(&mut *holder)
            .await
            .unwrap();

        let err = service
            .bulk_create(BulkCreateDto {
                items: items(&["One"]),
                status: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m.starts_with("Another bulk import")));

        sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(test_directory_config().bulk_import_lock_key)
            .execute(&mut *holder)
            .await
            .unwrap();
        drop(holder);

        let result = service
            .bulk_create(BulkCreateDto {
                items: items(&["One"]),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(result.created, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_cancelled_import_releases_lock(pool: PgPool) {
        let service = service(pool.clone());
        let names: Vec<String> = (0..20_000).map(|i| format!("Firm {}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            service.bulk_create(BulkCreateDto {
                items: items(&names),
                status: None,
            }),
        )
        .await;

        // the dropped transaction is rolled back when its connection is reclaimed
        let mut outcome = None;
        for _ in 0..50 {
            match service
                .bulk_create(BulkCreateDto {
                    items: items(&["After"]),
                    status: None,
                })
                .await
            {
                Err(AppError::Conflict(_)) => {
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await
                }
                other => {
                    outcome = Some(other);
                    break;
                }
            }
        }
        assert_eq!(outcome.unwrap().unwrap().created, 1);

        let held: i64 =
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM pg_locks WHERE locktype = 'advisory' \
                 AND database = (SELECT oid FROM pg_database WHERE datname = current_database())",
            )
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(held, 0);
    }
}
