use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub minio: MinIOConfig,
    pub cache: CacheConfig,
    pub upload: UploadConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub statement_timeout_secs: u64,
}

/// MinIO/S3 storage configuration for photo uploads
#[derive(Debug, Clone)]
pub struct MinIOConfig {
    /// MinIO/S3 endpoint URL
    pub endpoint: String,
    /// Access key for authentication
    pub access_key: String,
    /// Secret key for authentication
    pub secret_key: String,
    /// Bucket name for storing photo blobs
    pub bucket: String,
    /// AWS region (for S3 compatibility)
    pub region: String,
}

/// Redis cache configuration for list-page caching
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// TTL for cached list pages
    pub ttl_secs: u64,
    /// Reconnect attempts before a command is given up on
    pub max_retries: usize,
    /// Cap for the exponential reconnect backoff
    pub max_retry_delay_ms: u64,
}

/// Limits and budget for the report creation path
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_files: usize,
    pub max_file_size: usize,
    /// End-to-end wall-clock budget for one creation, kept under the
    /// front-side proxy timeout
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
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
            minio: MinIOConfig::from_env()?,
            cache: CacheConfig::from_env()?,
            upload: UploadConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    // Large enough for the maximum photo batch plus form fields
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 25 * 1024 * 1024;

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size =
            parse_env("MAX_REQUEST_BODY_SIZE", Self::DEFAULT_MAX_REQUEST_BODY_SIZE)?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    // Conservative defaults for small-medium deployments behind a load balancer
    const DEFAULT_MAX_CONNECTIONS: u32 = 20;
    const DEFAULT_MIN_CONNECTIONS: u32 = 5;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes
    const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 10;

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_env("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_env(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_env("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
            statement_timeout_secs: parse_env(
                "DB_STATEMENT_TIMEOUT_SECS",
                Self::DEFAULT_STATEMENT_TIMEOUT_SECS,
            )?,
        })
    }
}

impl MinIOConfig {
    pub fn from_env() -> Result<Self, String> {
        let endpoint =
            env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());

        let access_key = env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let secret_key = env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let bucket = env::var("MINIO_BUCKET").unwrap_or_else(|_| "report-photos".to_string());

        let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        Ok(Self {
            endpoint,
            access_key,
            secret_key,
            bucket,
            region,
        })
    }
}

impl CacheConfig {
    const DEFAULT_TTL_SECS: u64 = 60;
    const DEFAULT_MAX_RETRIES: usize = 10;
    const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 3000;

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("REDIS_PORT")
            .unwrap_or_else(|_| "6379".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid REDIS_PORT: {}", e))?;
        let password = env::var("REDIS_PASSWORD").ok().filter(|s| !s.is_empty());

        Ok(Self {
            host,
            port,
            password,
            ttl_secs: parse_env("CACHE_TTL_SECS", Self::DEFAULT_TTL_SECS)?,
            max_retries: parse_env("REDIS_MAX_RETRIES", Self::DEFAULT_MAX_RETRIES)?,
            max_retry_delay_ms: parse_env(
                "REDIS_MAX_RETRY_DELAY_MS",
                Self::DEFAULT_MAX_RETRY_DELAY_MS,
            )?,
        })
    }

    /// Connection URL in the form redis://[:password@]host:port
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}", password, self.host, self.port),
            None => format!("redis://{}:{}", self.host, self.port),
        }
    }
}

impl UploadConfig {
    const DEFAULT_MAX_FILES: usize = 4;
    const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB per photo
    const DEFAULT_TIMEOUT_SECS: u64 = 9; // below the proxy's 10s cutoff

    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            max_files: parse_env("MAX_UPLOAD_FILES", Self::DEFAULT_MAX_FILES)?,
            max_file_size: parse_env("MAX_UPLOAD_FILE_SIZE", Self::DEFAULT_MAX_FILE_SIZE)?,
            timeout_secs: parse_env("UPLOAD_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS)?,
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Lapor API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Citizen report intake API".to_string());

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_url_includes_password_when_set() {
        let config = CacheConfig {
            host: "cache.internal".to_string(),
            port: 6380,
            password: Some("hunter2".to_string()),
            ttl_secs: 60,
            max_retries: 10,
            max_retry_delay_ms: 3000,
        };
        assert_eq!(config.url(), "redis://:hunter2@cache.internal:6380");
    }

    #[test]
    fn cache_url_without_password() {
        let config = CacheConfig {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            ttl_secs: 60,
            max_retries: 10,
            max_retry_delay_ms: 3000,
        };
        assert_eq!(config.url(), "redis://127.0.0.1:6379");
    }
}
