use std::future::Future;
use std::time::Duration;

use crate::core::error::{AppError, Result};

/// Race an operation against a fixed wall-clock budget.
///
/// On expiry the caller stops waiting and receives `AppError::Timeout`; the
/// operation's own futures are dropped, but work it spawned onto the runtime
/// keeps running. Callers owning partial progress must compensate it
/// themselves after a timeout, with deletes that tolerate concurrently
/// finishing work.
pub async fn with_deadline<F, T>(budget: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(budget, operation).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "operation exceeded its {}ms budget",
            budget.as_millis()
        ))),
    }
}
