//! Bounded retry for store connectivity at pipeline entry

use std::future::Future;
use std::time::Duration;

use hire_common::config::IntakeConfig;
use hire_common::{Error, Result};
use sqlx::SqlitePool;

/// Fixed-backoff retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&IntakeConfig::default())
    }
}

impl From<&IntakeConfig> for RetryPolicy {
    fn from(config: &IntakeConfig) -> Self {
        Self::new(
            config.connect_attempts,
            Duration::from_millis(config.connect_backoff_ms),
        )
    }
}

/// Run `operation`, retrying only while it fails with a connectivity error
///
/// Any other error is returned immediately. After the last attempt the final
/// connectivity error is returned unchanged.
pub async fn retry_store_unavailable<F, Fut, T>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Store operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if err.is_store_unavailable() && attempt < policy.attempts => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = policy.attempts,
                    backoff_ms = policy.backoff.as_millis() as u64,
                    error = %err,
                    "Store unavailable, retrying"
                );
                tokio::time::sleep(policy.backoff).await;
            }
            Err(err) => {
                if err.is_store_unavailable() {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Store unavailable, giving up"
                    );
                }
                return Err(err);
            }
        }
    }
}

/// Round-trip to the store, retrying per `policy`
pub async fn ensure_store_reachable(pool: &SqlitePool, policy: RetryPolicy) -> Result<()> {
    retry_store_unavailable("store ping", policy, || async move {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map(|_| ())
            .map_err(Error::from)
    })
    .await
}
