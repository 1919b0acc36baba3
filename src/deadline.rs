use std::future::Future;
use std::time::Duration;

use crate::error::{GlimpseError, Result};

/// Run a collaborator call under a deadline. Expiry becomes
/// `GlimpseError::Timeout` naming the operation.
pub async fn with_timeout<T, F>(operation: &'static str, after: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(GlimpseError::Timeout {
            operation,
            after_ms: after.as_millis() as u64,
        }),
    }
}
