mod bulk_service;
mod listing_service;

pub use listing_service::ListingService;
