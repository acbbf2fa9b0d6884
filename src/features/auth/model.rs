use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::ROLE_ADMIN;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Subject of the bearer token; stored as `claimed_by` / `user_id` on records
    pub user_id: String,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    /// Check if user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Admins moderate listings, claims, categories and reviews
    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}
