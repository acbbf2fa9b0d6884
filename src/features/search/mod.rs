pub mod dtos;
pub mod handlers;
pub mod ranking;
pub mod routes;
pub mod services;

pub use services::SearchService;
