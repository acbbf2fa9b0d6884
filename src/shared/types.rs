use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::core::config::parse_flag;
use crate::core::error::AppError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub meta: Option<Meta>,
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Meta {
    pub total: i64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: Option<String>, meta: Option<Meta>) -> Self {
        Self {
            success: true,
            data,
            message,
            meta,
            errors: None,
        }
    }

    pub fn error(message: Option<String>, errors: Option<Vec<String>>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message,
            meta: None,
            errors,
        }
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// `(limit, offset)` from optional query values.
///
/// `limit` falls back to `default_limit` and is clamped to `[1, max_limit]`;
/// a negative `offset` is a client error.
pub fn resolve_page(
    limit: Option<i64>,
    offset: Option<i64>,
    default_limit: i64,
    max_limit: i64,
) -> Result<(i64, i64), AppError> {
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::BadRequest("offset must be >= 0".to_string()));
    }
    let limit = limit.unwrap_or(default_limit).clamp(1, max_limit.max(1));
    Ok((limit, offset))
}

// =============================================================================
// PATCH SEMANTICS
// =============================================================================

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query-string flag: `1`, `true`, `yes`, `on` (any case) are true, anything else false.
///
/// Use with `#[serde(default, deserialize_with = "flag_option")]`.
pub fn flag_option<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(|raw| parse_flag(&raw)))
}
