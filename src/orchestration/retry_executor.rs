//! # Retry Executor
//!
//! Wraps a single asynchronous operation with bounded retry, exponential
//! backoff, and jitter.
//!
//! ## Overview
//!
//! An operation is attempted up to `max_retries + 1` times. After each
//! failure the error is classified (see
//! [`error_classifier`](crate::orchestration::error_classifier)):
//! Terminal and Fatal errors are returned immediately without sleeping,
//! Retryable errors wait out a delay and re-invoke the operation.
//!
//! Delay selection:
//! - Rate limits honor the server-advertised retry-after when present and
//!   fall back to the configured rate-limit backoff otherwise.
//! - Everything else uses `min(base * 2^retry_index, max) + random(0, jitter_max)`.
//!
//! Backoff sleeps go through the shared [`AbortSignal`], so an operation
//! abort ends retrying promptly instead of sleeping out the schedule.
//!
//! Operations must be safe to re-invoke; callers are responsible for
//! idempotency or for embedding uniqueness tokens.

use crate::config::RetryConfig;
use crate::orchestration::error_classifier::{classify, Classification, ErrorCategory};
use crate::orchestration::errors::OrchestrationError;
use crate::orchestration::types::{AbortSignal, SleepOutcome};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Successful result of a retry-wrapped operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome<T> {
    pub value: T,
    /// Retries actually consumed (0 when the first attempt succeeded).
    pub retry_count: u32,
}

/// The last error of an exhausted or non-retryable operation, tagged with
/// its category and the retries consumed before giving up.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedError {
    pub error: OrchestrationError,
    pub category: ErrorCategory,
    pub retry_count: u32,
}

impl ClassifiedError {
    /// An error raised before any remote attempt was made.
    pub fn unretried(error: OrchestrationError) -> Self {
        let category = classify(&error).category;
        Self {
            error,
            category,
            retry_count: 0,
        }
    }
}

/// Executes operations with bounded retry and backoff. One executor may
/// serve several `execute` calls; each call gets its own retry budget.
pub struct RetryExecutor {
    config: RetryConfig,
    signal: Arc<AbortSignal>,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig, signal: Arc<AbortSignal>) -> Self {
        Self { config, signal }
    }

    /// Attempt `operation` until it succeeds, fails non-retryably, or the
    /// retry budget is exhausted.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<RetryOutcome<T>, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OrchestrationError>>,
    {
        let mut retry_count: u32 = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(RetryOutcome { value, retry_count }),
                Err(error) => {
                    let classification = classify(&error);
                    let budget_exhausted = retry_count >= self.config.max_retries;

                    if classification.category != ErrorCategory::Retryable || budget_exhausted {
                        return Err(ClassifiedError {
                            error,
                            category: classification.category,
                            retry_count,
                        });
                    }

                    let delay = self.retry_delay(&classification, retry_count);
                    debug!(
                        retry_index = retry_count,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        rate_limited = classification.rate_limited,
                        error = %error,
                        "Retrying after transient failure"
                    );

                    if self.signal.sleep(delay).await == SleepOutcome::Aborted {
                        // The operation is being torn down; surface the last
                        // error rather than starting another attempt.
                        return Err(ClassifiedError {
                            error,
                            category: classification.category,
                            retry_count,
                        });
                    }

                    retry_count += 1;
                }
            }
        }
    }

    /// Delay before retry number `retry_index` (0-based).
    fn retry_delay(&self, classification: &Classification, retry_index: u32) -> Duration {
        if classification.rate_limited {
            return classification
                .retry_after
                .unwrap_or(self.config.rate_limit_backoff);
        }

        let factor = 2u32.saturating_pow(retry_index.min(31));
        let exponential = self
            .config
            .retry_base_delay
            .saturating_mul(factor)
            .min(self.config.retry_max_delay);
        exponential + bounded_jitter(self.config.jitter_max)
    }
}

/// Uniform random delay in `[0, max]`, shared by backoff and batch stagger.
pub(crate) fn bounded_jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let mut rng = rand::thread_rng();
    Duration::from_millis(rng.gen_range(0..=max_ms))
}
