//! Deadline-bounded retry with exponential backoff.
//!
//! Every outbound call that may fail transiently goes through [`retry`]. The
//! caller decides which errors are worth another attempt; everything else is
//! returned immediately. Once the elapsed time since the first attempt reaches
//! the policy's deadline, the last error is returned unchanged.

use crate::counter;
use crate::metrics_defs::{RETRY_ATTEMPT, RETRY_EXHAUSTED};
use serde::Deserialize;
use std::fmt::Display;
use std::future::Future;
use tokio::time::{Duration, Instant, sleep};

const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
const DEFAULT_MULTIPLIER: u32 = 2;
const DEFAULT_MAX_ELAPSED_SECS: u64 = 15;

// Keeps the multiplier power from overflowing on very long deadlines.
const MAX_EXPONENT: u32 = 16;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub initial_delay_ms: u64,
    /// Factor applied to the delay after every failed attempt.
    pub multiplier: u32,
    /// Total time budget measured from the first attempt.
    pub max_elapsed_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            multiplier: DEFAULT_MULTIPLIER,
            max_elapsed_secs: DEFAULT_MAX_ELAPSED_SECS,
        }
    }
}

impl RetryPolicy {
    pub fn max_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_elapsed_secs)
    }

    /// Backoff to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        Duration::from_millis(self.initial_delay_ms).saturating_mul(factor)
    }
}

/// Runs `op` until it succeeds, fails with an error `is_retryable` rejects, or
/// the policy deadline passes. Backoff waits are clipped to the time left
/// before the deadline so the final attempt lands on it.
pub async fn retry<T, E, Op, Fut, R>(
    policy: &RetryPolicy,
    operation: &'static str,
    is_retryable: R,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    let started = Instant::now();
    let deadline = policy.max_elapsed();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err) {
            return Err(err);
        }

        let elapsed = started.elapsed();
        if elapsed >= deadline {
            tracing::warn!(
                operation,
                attempt,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %err,
                "giving up after retry deadline"
            );
            counter!(RETRY_EXHAUSTED, "operation" => operation).increment(1);
            return Err(err);
        }

        let delay = policy.delay_for(attempt).min(deadline - elapsed);
        tracing::info!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retrying after failure"
        );
        counter!(RETRY_ATTEMPT, "operation" => operation).increment(1);
        sleep(delay).await;
    }
}
