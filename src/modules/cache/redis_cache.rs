//! Redis-backed list-page cache
//!
//! Built on a managed connection that reconnects with bounded exponential
//! backoff, so a cache outage costs cache hits, not requests.

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use tracing::info;

use crate::core::config::CacheConfig;
use crate::modules::cache::{Cache, CacheError};

pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to the cache endpoint. Fails only when the initial connection
    /// cannot be established; after that the manager reconnects on its own.
    pub async fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let client = redis::Client::open(config.url())
            .map_err(|e| CacheError::Unavailable(format!("invalid redis URL: {}", e)))?;

        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(config.max_retries)
            .set_max_delay(config.max_retry_delay_ms);

        let manager = ConnectionManager::new_with_config(client, manager_config).await?;

        info!("Redis cache connected: {}:{}", config.host, config.port);

        Ok(Self { manager })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
