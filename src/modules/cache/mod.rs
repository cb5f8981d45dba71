//! List-page cache module
//!
//! Provides the `Cache` seam the read path and the creation saga talk to,
//! plus a Redis-backed implementation. Cache failures are a local concern:
//! callers log and degrade to uncached operation, so `CacheError` never
//! crosses into `AppError`.

mod redis_cache;

use async_trait::async_trait;
use thiserror::Error;

pub use redis_cache::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache command failed: {0}")]
    Command(#[from] redis::RedisError),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Key-value operations for cached list pages. Invalidation is always
/// key-scoped; there is deliberately no flush operation.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// Stand-in used when the cache endpoint is unreachable at startup: every
/// read misses and every write succeeds, so the service runs uncached
/// instead of refusing to start.
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<(), CacheError> {
        Ok(())
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}
