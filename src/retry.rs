//! Attempt loop for a task's advisory [`RetryPolicy`].
//!
//! The pipeline itself runs every task exactly once. This is the loop an
//! outer scheduler applies on top: bounded attempts, a per-attempt timeout
//! and a fixed delay between attempts.

use std::future::Future;

use tokio::time::{sleep, timeout};

use crate::error::{FeedError, Result};
use crate::types::RetryPolicy;

impl RetryPolicy {
    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// the attempts run out. `op` receives the zero-based attempt number.
    pub async fn retry_async<F, Fut, T>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;
        loop {
            let result = match timeout(self.timeout, op(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(FeedError::Timeout(self.timeout)),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= max_attempts || !err.is_retryable() {
                        return Err(err);
                    }
                    tracing::warn!(attempt, max_attempts, error = %err, "attempt failed, retrying");
                    sleep(self.delay).await;
                }
            }
        }
    }
}
