//! Retry with exponential backoff for idempotent backend reads.
//!
//! Only reads go through here. Cart mutations and completion calls are never
//! replayed automatically: a timed-out completion may still have created an
//! order, and the reconciler is the component that decides what to do then.

use std::future::Future;
use std::time::Duration;

use super::MedusaError;
use crate::delay::Sleeper;

/// Longest single wait, whatever `Retry-After` asks for.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Executes `operation`, retrying transient failures.
///
/// Retriable errors ([`MedusaError::is_retriable`]) are retried up to
/// `max_retries` additional times, sleeping `base_delay * 2^attempt` between
/// attempts. A rate-limit response waits at least as long as the backend asked.
/// Every wait is capped at 60 s. Anything else is returned immediately.
///
/// With `max_retries = 3` the operation is attempted at most 4 times total.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    base_delay: Duration,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T, MedusaError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MedusaError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_retriable() || attempt >= max_retries {
            return Err(err);
        }

        let backoff = base_delay.saturating_mul(1u32 << attempt.min(16));
        let delay = match err {
            MedusaError::RateLimited(secs) => backoff.max(Duration::from_secs(secs)),
            _ => backoff,
        }
        .min(MAX_DELAY);
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "Transient backend error, retrying after backoff"
        );
        sleeper.sleep(delay).await;
        attempt += 1;
    }
}
