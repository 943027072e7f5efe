//! Per-operation configuration for the batch-copy engine.
//!
//! One immutable [`BatchCopyConfig`] value is constructed per `run`
//! invocation and threaded through every component as a parameter. There is
//! no global or swappable configuration state.

use crate::error::{Result, StagehandError};
use crate::orchestration::chunker::ChunkPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behavior shared by every retry-wrapped remote operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts per retryable operation (total invocations
    /// are `max_retries + 1`).
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub retry_base_delay: Duration,
    /// Cap on the exponential backoff delay (before jitter).
    pub retry_max_delay: Duration,
    /// Upper bound of the random delay added to backoff and stagger.
    pub jitter_max: Duration,
    /// Fallback delay for rate-limit errors lacking a server-provided
    /// retry-after value.
    pub rate_limit_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(60),
            jitter_max: Duration::from_millis(250),
            rate_limit_backoff: Duration::from_secs(60),
        }
    }
}

/// Configuration for one staged parallel batch-copy operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCopyConfig {
    /// Upper bound on entries per low-level chunk; the unbounded sentinel
    /// disables chunking. Applied by `BatchCopyCoordinator::chunk_entries`
    /// when callers split their own entry lists; the staged `run` path
    /// derives its per-batch size from `parallel_batch_count` instead.
    pub batch_size: ChunkPolicy,
    /// Number of concurrent batches the file list is divided into.
    pub parallel_batch_count: usize,
    /// Delay multiplier between successive batch start times.
    pub batch_stagger: Duration,
    /// Retry behavior for copy submission and job polling.
    pub retry: RetryConfig,
    /// Max wall-clock time to wait for one batch's asynchronous copy job.
    pub batch_timeout: Duration,
    /// Spacing between asynchronous-job status checks.
    pub poll_interval: Duration,
    /// Fraction of batches allowed to fail before the whole operation is
    /// declared failed.
    pub max_failure_rate: f64,
    /// Optional end-to-end deadline; on expiry the shared abort signal is
    /// tripped and remaining batches settle as aborted.
    pub operation_timeout: Option<Duration>,
}

impl Default for BatchCopyConfig {
    fn default() -> Self {
        Self {
            batch_size: ChunkPolicy::Unbounded,
            parallel_batch_count: 5,
            batch_stagger: Duration::from_millis(500),
            retry: RetryConfig::default(),
            batch_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(2),
            max_failure_rate: 0.1,
            operation_timeout: None,
        }
    }
}

impl BatchCopyConfig {
    /// Apply environment overrides on top of the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(policy) = std::env::var("STAGEHAND_BATCH_SIZE") {
            config.batch_size = policy.parse()?;
        }

        if let Ok(count) = std::env::var("STAGEHAND_PARALLEL_BATCH_COUNT") {
            config.parallel_batch_count = count.parse().map_err(|e| {
                StagehandError::ConfigurationError(format!("Invalid parallel_batch_count: {e}"))
            })?;
        }

        if let Ok(retries) = std::env::var("STAGEHAND_MAX_RETRIES") {
            config.retry.max_retries = retries.parse().map_err(|e| {
                StagehandError::ConfigurationError(format!("Invalid max_retries: {e}"))
            })?;
        }

        if let Ok(rate) = std::env::var("STAGEHAND_MAX_FAILURE_RATE") {
            config.max_failure_rate = rate.parse().map_err(|e| {
                StagehandError::ConfigurationError(format!("Invalid max_failure_rate: {e}"))
            })?;
        }

        if let Ok(ms) = std::env::var("STAGEHAND_BATCH_TIMEOUT_MS") {
            config.batch_timeout = Duration::from_millis(ms.parse().map_err(|e| {
                StagehandError::ConfigurationError(format!("Invalid batch_timeout_ms: {e}"))
            })?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Configuration with short delays for tests.
    pub fn for_testing() -> Self {
        Self {
            batch_size: ChunkPolicy::Unbounded,
            parallel_batch_count: 5,
            batch_stagger: Duration::from_millis(10),
            retry: RetryConfig {
                max_retries: 2,
                retry_base_delay: Duration::from_millis(10),
                retry_max_delay: Duration::from_millis(100),
                jitter_max: Duration::ZERO,
                rate_limit_backoff: Duration::from_millis(50),
            },
            batch_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(10),
            max_failure_rate: 0.1,
            operation_timeout: None,
        }
    }

    /// Reject configurations that cannot drive a well-defined operation.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.batch_size, ChunkPolicy::Bounded(0)) {
            return Err(StagehandError::ConfigurationError(
                "batch_size must be at least 1 or the unbounded sentinel".to_string(),
            ));
        }
        if self.parallel_batch_count == 0 {
            return Err(StagehandError::ConfigurationError(
                "parallel_batch_count must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_failure_rate) {
            return Err(StagehandError::ConfigurationError(format!(
                "max_failure_rate must be within [0, 1], got {}",
                self.max_failure_rate
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(StagehandError::ConfigurationError(
                "poll_interval must be positive".to_string(),
            ));
        }
        if self.batch_timeout.is_zero() {
            return Err(StagehandError::ConfigurationError(
                "batch_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
