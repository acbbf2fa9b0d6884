use async_trait::async_trait;

use crate::features::categories::services::CategoryService;

/// Invoked after listing writes that can move a category's active count
/// (create, status flip, recategorization, delete, bulk reassignment).
///
/// Counts are advisory: implementations log failures and never surface them
/// to the write that triggered the recompute.
#[async_trait]
pub trait ListingCountTrigger: Send + Sync {
    async fn listings_changed(&self, category_ids: &[Option<i64>]);
}

#[async_trait]
impl ListingCountTrigger for CategoryService {
    async fn listings_changed(&self, category_ids: &[Option<i64>]) {
        let ids: Vec<i64> = category_ids.iter().flatten().copied().collect();
        if ids.is_empty() {
            return;
        }

        if let Err(e) = self.recalc_listing_counts(Some(&ids)).await {
            tracing::warn!(?ids, "Category count recompute failed: {}", e);
        }
    }
}
