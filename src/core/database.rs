use crate::core::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::time::Duration;

/// Build the shared connection pool. Pool bounds and the acquire timeout keep
/// one slow creation from starving concurrent requests; the per-connection
/// statement timeout bounds individual queries server-side.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let statement_timeout_ms = config.statement_timeout_secs * 1000;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(format!("SET statement_timeout = {}", statement_timeout_ms).as_str())
                    .await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
}
