pub mod business_dto;
pub mod listing_dto;
pub mod provider_dto;

pub use business_dto::{BusinessOwnerEditDto, CreateBusinessDto, UpdateBusinessDto};
pub use listing_dto::*;
pub use provider_dto::{CreateProviderDto, ProviderOwnerEditDto, UpdateProviderDto};
