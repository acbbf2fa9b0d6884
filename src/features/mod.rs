pub mod auth;
pub mod categories;
pub mod listings;
pub mod reviews;
pub mod search;
