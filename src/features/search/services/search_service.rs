use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};

use crate::core::config::DirectoryConfig;
use crate::core::database::db_error;
use crate::core::error::Result;
use crate::features::listings::listing::Listing;
use crate::features::listings::models::{Business, Provider};
use crate::features::search::dtos::{SearchHitDto, SearchQuery, SearchResultsDto};
use crate::features::search::ranking::{self, merge_ranked, RankKey};
use crate::shared::sql::{contains_pattern, prefix_pattern};
use crate::shared::types::resolve_page;

/// A listing row annotated with its relevance score and category labels
#[derive(Debug)]
pub struct Ranked<T> {
    pub rank: i32,
    pub category_name: Option<String>,
    pub category_full_slug: Option<String>,
    pub listing: T,
}

impl<'r, T: Listing> FromRow<'r, PgRow> for Ranked<T> {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            rank: row.try_get("rank")?,
            category_name: row.try_get("category_name")?,
            category_full_slug: row.try_get("category_full_slug")?,
            listing: T::from_row(row)?,
        })
    }
}

impl<T: Listing> Ranked<T> {
    fn key(&self) -> RankKey {
        RankKey {
            rank: self.rank,
            is_premium: self.listing.is_premium(),
            average_rating: self.listing.average_rating(),
            updated_at: self.listing.updated_at(),
            id: self.listing.id(),
        }
    }

    fn into_hit(self, q: Option<&str>) -> SearchHitDto {
        let matched = match q {
            Some(q) => {
                ranking::explain(
                    &self.listing.search_text(),
                    self.category_name.as_deref(),
                    q,
                )
                .1
            }
            None => Vec::new(),
        };
        SearchHitDto {
            rank: self.rank,
            matched,
            category_name: self.category_name,
            category_full_slug: self.category_full_slug,
            listing: self.listing.into_any(),
        }
    }
}

/// Blended search over businesses and providers
pub struct SearchService {
    pool: PgPool,
    default_limit: i64,
    max_limit: i64,
}

impl SearchService {
    pub fn new(pool: PgPool, config: &DirectoryConfig) -> Self {
        Self {
            pool,
            default_limit: config.search_default_limit,
            max_limit: config.search_max_limit,
        }
    }

    /// Rank each kind in SQL, fetch the first `offset + limit` of each,
    /// then merge and cut the page in process
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResultsDto> {
        let (limit, offset) =
            resolve_page(query.limit, query.offset, self.default_limit, self.max_limit)?;
        let q = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
        let fetch = offset.saturating_add(limit);

        let businesses = self.ranked::<Business>(query, q, fetch).await?;
        let providers = self.ranked::<Provider>(query, q, fetch).await?;
        tracing::debug!(
            q,
            businesses = businesses.len(),
            providers = providers.len(),
            "Search candidates fetched"
        );

        let hits: Vec<SearchHitDto> = merge_ranked(
            businesses.into_iter().map(Candidate::Business).collect(),
            providers.into_iter().map(Candidate::Provider).collect(),
            Candidate::key,
            offset as usize,
            limit as usize,
        )
        .into_iter()
        .map(|candidate| candidate.into_hit(q))
        .collect();

        Ok(SearchResultsDto {
            items: hits,
            limit,
            offset,
        })
    }

    async fn ranked<T: Listing>(
        &self,
        query: &SearchQuery,
        q: Option<&str>,
        fetch: i64,
    ) -> Result<Vec<Ranked<T>>> {
        let mut qb = build_ranked_query::<T>(query, q, fetch);
        qb.build_query_as::<Ranked<T>>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to run search"))
    }
}

fn build_ranked_query<T: Listing>(
    query: &SearchQuery,
    q: Option<&str>,
    fetch: i64,
) -> QueryBuilder<'static, Postgres> {
    let kind = T::KIND;
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT l.*, c.name AS category_name, c.full_slug AS category_full_slug, ",
    );
    match q {
        Some(q) => ranking::push_score(&mut qb, kind, q),
        None => {
            qb.push("0");
        }
    }
    qb.push(format!(
        " AS rank FROM {} l LEFT JOIN categories c ON c.id = l.category_id WHERE TRUE",
        kind.table()
    ));

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
        qb.push(" AND l.city ILIKE ")
            .push_bind(contains_pattern(city))
            .push(" ESCAPE '\\'");
    }
    if let Some(state) = non_blank(&query.state) {
        qb.push(" AND LOWER(l.state) = LOWER(")
            .push_bind(state.to_string())
            .push(")");
    }
    if query.is_premium == Some(true) {
        qb.push(" AND l.is_premium");
    }
    if let Some(q) = q {
        qb.push(" AND ");
        ranking::push_match(&mut qb, kind, q);
    }

    qb.push(" ORDER BY rank DESC, l.is_premium DESC, l.average_rating DESC, l.updated_at DESC, l.id DESC LIMIT ")
        .push_bind(fetch);
    qb
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A ranked row of either kind, so both can share one merge
enum Candidate {
    Business(Ranked<Business>),
    Provider(Ranked<Provider>),
}

impl Candidate {
    fn key(&self) -> RankKey {
        match self {
            Candidate::Business(ranked) => ranked.key(),
            Candidate::Provider(ranked) => ranked.key(),
        }
    }

    fn into_hit(self, q: Option<&str>) -> SearchHitDto {
        match self {
            Candidate::Business(ranked) => ranked.into_hit(q),
            Candidate::Provider(ranked) => ranked.into_hit(q),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::listings::models::ListingStatus;

    fn sql(query: &SearchQuery) -> String {
        let q = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
        build_ranked_query::<Business>(query, q, 20)
            .sql()
            .to_string()
    }

    #[test]
    fn test_no_query_skips_scoring() {
        let sql = sql(&SearchQuery::default());
        assert!(sql.contains(", 0 AS rank FROM businesses l"));
        assert!(!sql.contains("CASE"));
        assert!(sql.ends_with(
            "ORDER BY rank DESC, l.is_premium DESC, l.average_rating DESC, l.updated_at DESC, l.id DESC LIMIT $1"
        ));
    }

    #[test]
    fn test_filters_apply_before_match() {
        let sql = sql(&SearchQuery {
            q: Some(" smith ".to_string()),
            status: Some(ListingStatus::Active),
            city: Some("austin".to_string()),
            is_premium: Some(true),
            ..Default::default()
        });
        assert!(sql.contains("(CASE WHEN LOWER(l.name) = LOWER($1)"));
        assert!(sql.contains("AND l.status = $"));
        assert!(sql.contains("AND l.city ILIKE $"));
        assert!(sql.contains("AND l.is_premium AND (l.name ILIKE"));
    }

    #[test]
    fn test_premium_false_is_not_a_filter() {
        let sql = sql(&SearchQuery {
            is_premium: Some(false),
            ..Default::default()
        });
        assert!(!sql.contains("AND l.is_premium"));
    }
}

#[cfg(test)]
mod db_tests {
    use std::collections::HashSet;

    use super::*;
    use crate::features::listings::listing::AnyListing;
    use crate::shared::test_helpers::test_directory_config;

    async fn business(pool: &PgPool, name: &str, slug: &str) {
        sqlx::query("INSERT INTO businesses (name, slug) VALUES ($1, $2)")
            .bind(name)
            .bind(slug)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn provider(pool: &PgPool, name: &str, specialty: &str, slug: &str) {
        sqlx::query("INSERT INTO providers (provider_name, specialty, slug) VALUES ($1, $2, $3)")
            .bind(name)
            .bind(specialty)
            .bind(slug)
            .execute(pool)
            .await
            .unwrap();
    }

    fn smith(offset: i64, limit: i64) -> SearchQuery {
        SearchQuery {
            q: Some("smith".to_string()),
            offset: Some(offset),
            limit: Some(limit),
            ..Default::default()
        }
    }

    fn names(results: &SearchResultsDto) -> Vec<(i32, String)> {
        results
            .items
            .iter()
            .map(|hit| {
                let name = match &hit.listing {
                    AnyListing::Business(b) => b.name.clone(),
                    AnyListing::Provider(p) => p.provider_name.clone(),
                };
                (hit.rank, name)
            })
            .collect()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_blends_kinds_by_rank(pool: PgPool) {
        business(&pool, "Smith", "smith").await;
        business(&pool, "Smith & Associates", "smith-associates").await;
        provider(&pool, "Smithfield Pediatrics", "Smith-Magenis syndrome care", "smithfield-pediatrics").await;
        let service = SearchService::new(pool, &test_directory_config());

        let first = service.search(&smith(0, 2)).await.unwrap();
        assert_eq!(
            names(&first),
            vec![
                (100, "Smith".to_string()),
                (80, "Smithfield Pediatrics".to_string()),
            ]
        );

        let second = service.search(&smith(1, 1)).await.unwrap();
        assert_eq!(names(&second), vec![(80, "Smithfield Pediatrics".to_string())]);

        let third = service.search(&smith(2, 1)).await.unwrap();
        assert_eq!(names(&third), vec![(60, "Smith & Associates".to_string())]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_tied_rows_page_without_repeats(pool: PgPool) {
        sqlx::query(
            "INSERT INTO businesses (name, slug) SELECT 'Tie', 'tie-' || n FROM generate_series(1, 15) n",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO providers (provider_name, slug) SELECT 'Tie', 'tie-' || n FROM generate_series(1, 15) n",
        )
        .execute(&pool)
        .await
        .unwrap();
        let service = SearchService::new(pool, &test_directory_config());

        let mut seen = HashSet::new();
        for offset in (0..30).step_by(7) {
            let page = service
                .search(&SearchQuery {
                    q: Some("tie".to_string()),
                    offset: Some(offset),
                    limit: Some(7),
                    ..Default::default()
                })
                .await
                .unwrap();
            for hit in page.items {
                let key = match hit.listing {
                    AnyListing::Business(b) => ("business", b.id),
                    AnyListing::Provider(p) => ("provider", p.id),
                };
                assert!(seen.insert(key), "{:?} returned twice", key);
            }
        }
        assert_eq!(seen.len(), 30);
    }
}
