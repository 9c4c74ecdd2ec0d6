//! Bounded exponential backoff with jitter for retryable LLM failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::LlmError;

/// Maximum attempts per call (1 initial + retries).
const MAX_ATTEMPTS: u32 = 3;

/// Base delay, doubled per attempt.
const BASE_DELAY_MS: u64 = 500;

/// Delay cap.
const MAX_DELAY_MS: u64 = 8_000;

/// Run `op` with exponential backoff on retryable errors.
///
/// A provider-supplied `retry_after` overrides the computed delay. Jitter
/// is a uniform 0–250ms add-on so synchronized callers fan out.
pub(crate) async fn with_backoff<T, F, Fut>(op: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                let delay = delay_for(attempt, &err);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying LLM call"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn delay_for(attempt: u32, err: &LlmError) -> Duration {
    if let LlmError::RateLimited {
        retry_after: Some(after),
        ..
    } = err
    {
        return *after;
    }
    let exp = BASE_DELAY_MS.saturating_mul(1 << (attempt - 1)).min(MAX_DELAY_MS);
    let jitter = rand::thread_rng().gen_range(0..250);
    Duration::from_millis(exp + jitter)
}
