use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub swagger: SwaggerConfig,
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    /// Applied to every pooled connection; expiring statements surface as `AppError::Busy`
    pub statement_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: Option<String>,
    pub jwt_leeway: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Directory behaviour toggles, passed explicitly into the services that need them
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Count only `active` listings into `categories.business_count`
    pub count_active_only: bool,
    /// Upper bound for rows touched by a single bulk statement
    pub bulk_chunk_size: usize,
    /// Postgres advisory lock key guarding bulk imports
    pub bulk_import_lock_key: i64,
    /// Cap on parent hops when validating a new parent
    pub max_ancestor_hops: i64,
    /// Cap on breadcrumb length
    pub max_breadcrumb_depth: usize,
    pub search_default_limit: i64,
    pub search_max_limit: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            directory: DirectoryConfig::from_env()?,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("PORT", 3000)?,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            url: env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?,
            max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            min_connections: env_or("DB_MIN_CONNECTIONS", 1)?,
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 600)?,
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800)?,
            statement_timeout_ms: env_or("DB_STATEMENT_TIMEOUT_MS", 30_000)?,
        })
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET environment variable is required".to_string())?;

        Ok(Self {
            jwt_secret,
            issuer: env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty()),
            jwt_leeway: Duration::from_secs(env_or("JWT_LEEWAY", 60)?),
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Rankify Directory API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Business and provider directory API".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl DirectoryConfig {
    const DEFAULT_BULK_CHUNK_SIZE: usize = 5000;
    const DEFAULT_BULK_IMPORT_LOCK_KEY: i64 = 812_345;
    const DEFAULT_MAX_ANCESTOR_HOPS: i64 = 200;
    const DEFAULT_MAX_BREADCRUMB_DEPTH: usize = 50;
    const DEFAULT_SEARCH_LIMIT: i64 = 20;
    const DEFAULT_SEARCH_MAX_LIMIT: i64 = 100;

    pub fn from_env() -> Result<Self, String> {
        let count_active_only = env::var("COUNT_ACTIVE_ONLY")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        let bulk_chunk_size = env_or("BULK_CHUNK_SIZE", Self::DEFAULT_BULK_CHUNK_SIZE)?;
        if bulk_chunk_size == 0 {
            return Err("BULK_CHUNK_SIZE must be greater than zero".to_string());
        }

        let search_max_limit =
            env_or("SEARCH_MAX_LIMIT", Self::DEFAULT_SEARCH_MAX_LIMIT)?.max(1);

        Ok(Self {
            count_active_only,
            bulk_chunk_size,
            bulk_import_lock_key: env_or(
                "BULK_IMPORT_LOCK_KEY",
                Self::DEFAULT_BULK_IMPORT_LOCK_KEY,
            )?,
            max_ancestor_hops: Self::DEFAULT_MAX_ANCESTOR_HOPS,
            max_breadcrumb_depth: Self::DEFAULT_MAX_BREADCRUMB_DEPTH,
            search_default_limit: Self::DEFAULT_SEARCH_LIMIT.min(search_max_limit),
            search_max_limit,
        })
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            count_active_only: true,
            bulk_chunk_size: Self::DEFAULT_BULK_CHUNK_SIZE,
            bulk_import_lock_key: Self::DEFAULT_BULK_IMPORT_LOCK_KEY,
            max_ancestor_hops: Self::DEFAULT_MAX_ANCESTOR_HOPS,
            max_breadcrumb_depth: Self::DEFAULT_MAX_BREADCRUMB_DEPTH,
            search_default_limit: Self::DEFAULT_SEARCH_LIMIT,
            search_max_limit: Self::DEFAULT_SEARCH_MAX_LIMIT,
        }
    }
}

/// Numeric setting from the environment; unset falls back to `default`
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}

/// Interpret "1", "true", "yes", "on" (any case) as true
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(parse_flag("On"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_env_or_falls_back_when_unset() {
        assert_eq!(
            env_or::<u32>("RANKIFY_TEST_UNSET_SETTING", 7).unwrap(),
            7
        );
    }

    #[test]
    fn test_directory_defaults() {
        let config = DirectoryConfig::default();
        assert!(config.count_active_only);
        assert_eq!(config.bulk_chunk_size, 5000);
        assert_eq!(config.max_ancestor_hops, 200);
        assert_eq!(config.max_breadcrumb_depth, 50);
        assert_eq!(config.search_default_limit, 20);
    }
}
