#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;

use std::future::Future;
use std::time::Duration;

use crate::domain::models::GenerationError;
use crate::domain::models::ProviderError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> RetryPolicy {
        return RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(3000),
        };
    }
}

impl RetryPolicy {
    /// Delay before the nth retry. Grows linearly: 3s, 6s, 9s with the defaults.
    pub fn delay_for(&self, retry: u32) -> Duration {
        return self.base_delay * retry;
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy runs out of attempts. `op` receives the 1-based attempt number.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, GenerationError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    while attempt < policy.max_attempts {
        attempt += 1;

        let err = match op(attempt).await {
            Ok(res) => return Ok(res),
            Err(err) => err,
        };

        if !err.is_transient() {
            tracing::error!(attempt = attempt, error = %err, "Provider failed with a fatal error");
            return Err(GenerationError::Fatal(err));
        }

        if attempt >= policy.max_attempts {
            tracing::error!(attempt = attempt, error = %err, "Provider retries exhausted");
            return Err(GenerationError::RetriesExhausted(err));
        }

        let delay = policy.delay_for(attempt);
        tracing::warn!(
            attempt = attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "Model overloaded, retrying"
        );
        tokio::time::sleep(delay).await;
    }

    return Err(GenerationError::MaxRetriesExceeded);
}
