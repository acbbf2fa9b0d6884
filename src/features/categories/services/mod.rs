mod category_service;
mod listing_counts;

pub use category_service::CategoryService;
pub use listing_counts::ListingCountTrigger;
