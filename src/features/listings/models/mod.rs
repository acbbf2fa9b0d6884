mod business;
mod listing;
mod provider;

pub use business::Business;
pub use listing::{ListingKind, ListingStatus, ListingTarget};
pub use provider::Provider;
