use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::core::config::DirectoryConfig;
use crate::core::database::db_error;
use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::listings::models::ListingTarget;
use crate::features::reviews::dtos::{CreateReviewDto, ListReviewsQuery, UpdateReviewDto};
use crate::features::reviews::models::{Review, ReviewFlag, ReviewStatus};
use crate::shared::constants::RECENT_REVIEWS_LIMIT;
use crate::shared::types::resolve_page;

/// Mean of active ratings, kept inside the listing's 0..=5 constraint
pub fn average_rating(mean: Option<f64>) -> f64 {
    mean.filter(|m| m.is_finite()).unwrap_or(0.0).clamp(0.0, 5.0)
}

fn ensure_author_or_admin(review: &Review, actor: &AuthenticatedUser) -> Result<()> {
    if actor.is_admin() || review.user_id == actor.user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the author or an admin can change this review.".to_string(),
        ))
    }
}

fn ensure_owner_or_admin(owner: Option<&str>, actor: &AuthenticatedUser) -> Result<()> {
    if actor.is_admin() || owner == Some(actor.user_id.as_str()) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the listing owner or an admin can manage replies.".to_string(),
        ))
    }
}

pub struct ReviewService {
    pool: PgPool,
    default_limit: i64,
    max_limit: i64,
}

impl ReviewService {
    pub fn new(pool: PgPool, config: &DirectoryConfig) -> Self {
        Self {
            pool,
            default_limit: config.search_default_limit,
            max_limit: config.search_max_limit,
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub async fn get(&self, id: i64) -> Result<Review> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get review"))?
            .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))
    }

    pub async fn list(&self, query: &ListReviewsQuery) -> Result<(Vec<Review>, i64)> {
        let (limit, offset) =
            resolve_page(query.limit, query.offset, self.default_limit, self.max_limit)?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reviews WHERE TRUE");
        push_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count reviews"))?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM reviews WHERE TRUE");
        push_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let reviews = select
            .build_query_as::<Review>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list reviews"))?;

        Ok((reviews, total))
    }

    pub async fn recent(&self) -> Result<Vec<Review>> {
        sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE status = 'active' ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(RECENT_REVIEWS_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list recent reviews"))
    }

    pub async fn flags(&self, id: i64) -> Result<Vec<ReviewFlag>> {
        self.get(id).await?;
        sqlx::query_as::<_, ReviewFlag>(
            "SELECT * FROM review_flags WHERE review_id = $1 ORDER BY created_at DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list review flags"))
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    pub async fn create(&self, author: &AuthenticatedUser, dto: CreateReviewDto) -> Result<Review> {
        if !self.target_exists(dto.target).await? {
            return Err(AppError::BadRequest(format!(
                "{} {} does not exist",
                dto.target.kind(),
                dto.target.id()
            )));
        }

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (target_kind, target_id, user_id, rating, title, content, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            RETURNING *
            "#,
        )
        .bind(dto.target.kind())
        .bind(dto.target.id())
        .bind(&author.user_id)
        .bind(dto.rating)
        .bind(dto.title.trim())
        .bind(dto.content.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create review"))?;

        tracing::info!(id = review.id, target = ?review.target(), "Review submitted");
        Ok(review)
    }

    /// Author (or admin) edit of rating, title or content
    pub async fn update(
        &self,
        id: i64,
        actor: &AuthenticatedUser,
        dto: UpdateReviewDto,
    ) -> Result<Review> {
        let current = self.get(id).await?;
        ensure_author_or_admin(&current, actor)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;
        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(dto.rating)
        .bind(dto.title.as_deref().map(str::trim))
        .bind(dto.content.as_deref().map(str::trim))
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to update review"))?;

        if review.rating != current.rating && review.status == ReviewStatus::Active {
            refresh_listing_stats(&mut *tx, review.target()).await?;
        }
        tx.commit()
            .await
            .map_err(db_error("Failed to commit review update"))?;

        Ok(review)
    }

    /// Moderation (admin); the listing's rating follows the set of active reviews
    pub async fn set_status(
        &self,
        id: i64,
        status: ReviewStatus,
        verified: Option<bool>,
    ) -> Result<Review> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;
        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET status = $2, verified = COALESCE($3, verified), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(verified)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to update review status"))?
        .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))?;

        refresh_listing_stats(&mut *tx, review.target()).await?;
        tx.commit()
            .await
            .map_err(db_error("Failed to commit review status"))?;

        tracing::info!(id, ?status, "Review moderated");
        Ok(review)
    }

    pub async fn delete(&self, id: i64, actor: &AuthenticatedUser) -> Result<()> {
        let current = self.get(id).await?;
        ensure_author_or_admin(&current, actor)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;
        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete review"))?;
        if current.status == ReviewStatus::Active {
            refresh_listing_stats(&mut *tx, current.target()).await?;
        }
        tx.commit()
            .await
            .map_err(db_error("Failed to commit review delete"))?;

        Ok(())
    }

    pub async fn reply(&self, id: i64, actor: &AuthenticatedUser, content: &str) -> Result<Review> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("Reply content is required.".to_string()));
        }

        let current = self.get(id).await?;
        let owner = self.listing_owner(current.target()).await?;
        ensure_owner_or_admin(owner.as_deref(), actor)?;

        sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET owner_reply = $2, owner_replied_at = NOW(), owner_replied_by = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(content)
        .bind(&actor.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to save reply"))
    }

    pub async fn delete_reply(&self, id: i64, actor: &AuthenticatedUser) -> Result<Review> {
        let current = self.get(id).await?;
        let owner = self.listing_owner(current.target()).await?;
        ensure_owner_or_admin(owner.as_deref(), actor)?;

        sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET owner_reply = NULL, owner_replied_at = NULL, owner_replied_by = NULL
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to delete reply"))
    }

    pub async fn mark_helpful(&self, id: i64) -> Result<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET helpful_count = helpful_count + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to mark review helpful"))?
        .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))
    }

    /// Record a flag and move the review to `flagged`, pulling it out of the listing's rating
    pub async fn flag(&self, id: i64, actor: &AuthenticatedUser, note: Option<&str>) -> Result<Review> {
        let note = note.map(str::trim).filter(|n| !n.is_empty());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;
        let previous = sqlx::query_scalar::<_, ReviewStatus>(
            "SELECT status FROM reviews WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to lock review"))?
        .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))?;

        sqlx::query("INSERT INTO review_flags (review_id, flagged_by, note) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&actor.user_id)
            .bind(note)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to flag review"))?;

        let review = sqlx::query_as::<_, Review>(
            "UPDATE reviews SET status = 'flagged', updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to update flagged review"))?;

        if previous == ReviewStatus::Active {
            refresh_listing_stats(&mut *tx, review.target()).await?;
        }
        tx.commit()
            .await
            .map_err(db_error("Failed to commit review flag"))?;

        tracing::info!(id, flagged_by = %actor.user_id, "Review flagged");
        Ok(review)
    }

    // =========================================================================
    // TARGET LOOKUPS
    // =========================================================================

    async fn target_exists(&self, target: ListingTarget) -> Result<bool> {
        let sql = match target {
            ListingTarget::Business(_) => "SELECT EXISTS(SELECT 1 FROM businesses WHERE id = $1)",
            ListingTarget::Provider(_) => "SELECT EXISTS(SELECT 1 FROM providers WHERE id = $1)",
        };
        sqlx::query_scalar::<_, bool>(sql)
            .bind(target.id())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to check review target"))
    }

    async fn listing_owner(&self, target: ListingTarget) -> Result<Option<String>> {
        let sql = match target {
            ListingTarget::Business(_) => "SELECT claimed_by FROM businesses WHERE id = $1",
            ListingTarget::Provider(_) => "SELECT claimed_by FROM providers WHERE id = $1",
        };
        let owner = sqlx::query_scalar::<_, Option<String>>(sql)
            .bind(target.id())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load listing owner"))?;
        Ok(owner.flatten())
    }
}

/// Recompute `average_rating` and `total_reviews` on the reviewed listing
async fn refresh_listing_stats(conn: &mut PgConnection, target: ListingTarget) -> Result<()> {
    let (mean, total) = sqlx::query_as::<_, (Option<f64>, i64)>(
        r#"
        SELECT AVG(rating)::DOUBLE PRECISION, COUNT(*)
        FROM reviews
        WHERE target_kind = $1 AND target_id = $2 AND status = 'active'
        "#,
    )
    .bind(target.kind())
    .bind(target.id())
    .fetch_one(&mut *conn)
    .await
    .map_err(db_error("Failed to aggregate ratings"))?;

    let sql = format!(
        "UPDATE {} SET average_rating = $2, total_reviews = $3 WHERE id = $1",
        target.kind().table()
    );
    sqlx::query(&sql)
        .bind(target.id())
        .bind(average_rating(mean))
        .bind(i32::try_from(total).unwrap_or(i32::MAX))
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to update listing rating"))?;

    Ok(())
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ListReviewsQuery) {
    if let Some(kind) = query.kind {
        qb.push(" AND target_kind = ").push_bind(kind);
    }
    if let Some(target_id) = query.target_id {
        qb.push(" AND target_id = ").push_bind(target_id);
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(user_id) = query.user_id.as_deref().filter(|u| !u.is_empty()) {
        qb.push(" AND user_id = ").push_bind(user_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{create_admin_user, create_member_user};
    use chrono::Utc;

    fn review_by(user_id: &str) -> Review {
        Review {
            id: 1,
            target_kind: crate::features::listings::models::ListingKind::Business,
            target_id: 10,
            user_id: user_id.to_string(),
            rating: 4,
            title: "Good".to_string(),
            content: "Fine".to_string(),
            verified: false,
            helpful_count: 0,
            status: ReviewStatus::Active,
            owner_reply: None,
            owner_replied_at: None,
            owner_replied_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_average_rating_clamped() {
        assert_eq!(average_rating(None), 0.0);
        assert_eq!(average_rating(Some(4.5)), 4.5);
        assert_eq!(average_rating(Some(7.0)), 5.0);
        assert_eq!(average_rating(Some(f64::NAN)), 0.0);
    }

    #[test]
    fn test_author_or_admin() {
        let review = review_by("alice");
        assert!(ensure_author_or_admin(&review, &create_member_user("alice")).is_ok());
        assert!(ensure_author_or_admin(&review, &create_admin_user()).is_ok());
        assert!(matches!(
            ensure_author_or_admin(&review, &create_member_user("bob")),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_owner_or_admin() {
        let owner = create_member_user("owner");
        assert!(ensure_owner_or_admin(Some("owner"), &owner).is_ok());
        assert!(ensure_owner_or_admin(None, &create_admin_user()).is_ok());
        assert!(matches!(
            ensure_owner_or_admin(None, &owner),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_list_filters() {
        let query = ListReviewsQuery {
            kind: Some(crate::features::listings::models::ListingKind::Provider),
            target_id: Some(3),
            status: Some(ReviewStatus::Active),
            user_id: Some(String::new()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM reviews WHERE TRUE");
        push_filters(&mut qb, &query);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM reviews WHERE TRUE AND target_kind = $1 AND target_id = $2 AND status = $3"
        );
    }
}
