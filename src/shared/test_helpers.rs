#[cfg(test)]
use crate::features::auth::model::AuthenticatedUser;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, response::Response, Router};

#[cfg(test)]
#[allow(dead_code)]
pub fn create_admin_user() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: "test-admin".to_string(),
        roles: vec!["admin".to_string()],
    }
}

#[cfg(test)]
#[allow(dead_code)]
pub fn create_member_user(user_id: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: user_id.to_string(),
        roles: vec![],
    }
}

#[cfg(test)]
#[allow(dead_code)]
async fn inject_admin_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_admin_user());
    next.run(request).await
}

#[cfg(test)]
#[allow(dead_code)]
pub fn with_admin_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_admin_middleware))
}

/// Defaults with a tiny chunk size so bulk paths split into several statements
#[cfg(test)]
#[allow(dead_code)]
pub fn test_directory_config() -> crate::core::config::DirectoryConfig {
    crate::core::config::DirectoryConfig {
        bulk_chunk_size: 2,
        ..Default::default()
    }
}
