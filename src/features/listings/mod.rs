pub mod claim;
pub mod columns;
pub mod dtos;
pub mod handlers;
pub mod listing;
pub mod models;
pub mod routes;
pub mod services;

pub use handlers::ListingState;
pub use services::ListingService;
