use crate::core::config::DatabaseConfig;
use crate::core::error::AppError;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::time::Duration;

/// SQLSTATE for `query_canceled` (raised when `statement_timeout` fires)
const SQLSTATE_QUERY_CANCELED: &str = "57014";
/// SQLSTATE for `lock_not_available` (raised when `lock_timeout` fires)
const SQLSTATE_LOCK_NOT_AVAILABLE: &str = "55P03";
/// SQLSTATE for `deadlock_detected`, e.g. a rename racing a reparent in the same subtree
const SQLSTATE_DEADLOCK_DETECTED: &str = "40P01";
const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";
const SQLSTATE_FOREIGN_KEY_VIOLATION: &str = "23503";

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options = config
        .url
        .parse::<PgConnectOptions>()?
        .options([("statement_timeout", config.statement_timeout_ms.to_string())]);

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect_with(options)
        .await
}

/// Whether the error means the store was too busy to finish in time (retryable)
pub fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => {
            if matches!(
                db.code().as_deref(),
                Some(SQLSTATE_QUERY_CANCELED)
                    | Some(SQLSTATE_LOCK_NOT_AVAILABLE)
                    | Some(SQLSTATE_DEADLOCK_DETECTED)
            ) {
                return true;
            }
            is_timeout_message(db.message())
        }
        _ => false,
    }
}

fn is_timeout_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("statement timeout")
        || lowered.contains("canceling statement due to")
        || lowered.contains("lock timeout")
}

/// Classify a database error into the matching `AppError`
pub fn classify(err: sqlx::Error) -> AppError {
    if is_busy(&err) {
        return AppError::Busy("Database is busy; please retry later".to_string());
    }

    if let sqlx::Error::Database(ref db) = err {
        match db.code().as_deref() {
            Some(SQLSTATE_UNIQUE_VIOLATION) => {
                return AppError::Conflict(format!(
                    "Duplicate value violates {}",
                    db.constraint().unwrap_or("a unique constraint")
                ));
            }
            Some(SQLSTATE_FOREIGN_KEY_VIOLATION) => {
                return AppError::Conflict(format!(
                    "Row is still referenced ({})",
                    db.constraint().unwrap_or("foreign key")
                ));
            }
            _ => {}
        }
    }

    AppError::Database(err)
}

/// Log a failed database call with context and map it to an `AppError`
///
/// ```ignore
/// .fetch_all(&self.pool).await.map_err(db_error("Failed to list categories"))?;
/// ```
pub fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!("{}: {:?}", context, e);
        classify(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_messages_are_busy() {
        assert!(is_timeout_message(
            "canceling statement due to statement timeout"
        ));
        assert!(is_timeout_message("ERROR: Lock timeout exceeded"));
        assert!(!is_timeout_message("duplicate key value"));
    }

    #[test]
    fn test_pool_timeout_is_busy() {
        assert!(is_busy(&sqlx::Error::PoolTimedOut));
        assert!(!is_busy(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn test_classify_falls_back_to_database() {
        assert!(matches!(
            classify(sqlx::Error::RowNotFound),
            AppError::Database(_)
        ));
        assert!(matches!(
            classify(sqlx::Error::PoolTimedOut),
            AppError::Busy(_)
        ));
    }
}
