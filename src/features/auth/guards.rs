//! Role-based authorization guards.

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Guard for admin-only endpoints (status moderation, claim approval, bulk operations).
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireAdmin(user): RequireAdmin) { ... }
/// ```
pub struct RequireAdmin(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(RequireAdmin(user.clone()))
    }
}

/// Optional user for endpoints that behave differently for signed-in callers
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{create_member_user, with_admin_auth};
    use axum::{routing::get, Router};
    use axum_test::TestServer;

    async fn admin_only(RequireAdmin(user): RequireAdmin) -> String {
        user.user_id
    }

    #[tokio::test]
    async fn test_admin_passes() {
        let app = with_admin_auth(Router::new().route("/admin", get(admin_only)));
        let server = TestServer::new(app).unwrap();

        let response = server.get("/admin").await;
        response.assert_status_ok();
        response.assert_text("test-admin");
    }

    #[tokio::test]
    async fn test_member_is_forbidden() {
        let member = create_member_user("member-1");
        let app = Router::new()
            .route("/admin", get(admin_only))
            .layer(axum::Extension(member));
        let server = TestServer::new(app).unwrap();

        server.get("/admin").await.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_anonymous_is_unauthorized() {
        let app = Router::new().route("/admin", get(admin_only));
        let server = TestServer::new(app).unwrap();

        server.get("/admin").await.assert_status_unauthorized();
    }
}
