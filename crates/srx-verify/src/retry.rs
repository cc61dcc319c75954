//! Retry with exponential backoff for agent calls.

use crate::config::RetryPolicy;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Run `op` up to `policy.max_attempts` times, sleeping between attempts.
///
/// The delay doubles per attempt, is capped at the policy maximum, and
/// carries up to 100ms of random jitter so concurrent callers do not retry
/// in lockstep.
///
/// # Errors
/// Returns the last attempt's error once the attempt budget is exhausted.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    role: &'static str,
    mut op: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts => {
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..100));
                let delay = policy.delay_for_attempt(attempt) + jitter;
                tracing::warn!(
                    role,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "agent call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
