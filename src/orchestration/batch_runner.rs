//! # Batch Runner
//!
//! Executes one batch's remote copy request to completion.
//!
//! ## Protocol
//!
//! 1. Check the shared abort signal; if set, raise without contacting the
//!    remote service.
//! 2. Submit the copy request through the retry executor.
//! 3. Immediate completion returns; an asynchronous job handle enters a
//!    poll loop that sleeps `poll_interval` between status checks, re-checks
//!    the abort signal before each check, and gives up once `batch_timeout`
//!    has elapsed.
//!
//! The poll loop as a whole is one retry-executor-wrapped operation, so a
//! transient status-check failure gets its own bounded retry budget,
//! separate from the copy submission's budget. The timeout clock starts
//! before the wrapper: poll retries consume the budget, they never extend
//! it.

use crate::config::BatchCopyConfig;
use crate::logging::log_batch_operation;
use crate::orchestration::errors::{OrchestrationError, OrchestrationResult};
use crate::orchestration::retry_executor::{ClassifiedError, RetryExecutor, RetryOutcome};
use crate::orchestration::types::{AbortSignal, Batch, SleepOutcome};
use crate::storage::{CopyBatchLaunch, CopyEntry, CopyJobStatus, StorageClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Per-batch completion report fed into operation metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_index: usize,
    /// Retries consumed across copy submission and job polling.
    pub retry_count: u32,
}

/// Runs a single batch against the remote storage client.
pub struct BatchRunner {
    config: Arc<BatchCopyConfig>,
    client: Arc<dyn StorageClient>,
    signal: Arc<AbortSignal>,
}

impl BatchRunner {
    pub fn new(
        config: Arc<BatchCopyConfig>,
        client: Arc<dyn StorageClient>,
        signal: Arc<AbortSignal>,
    ) -> Self {
        Self {
            config,
            client,
            signal,
        }
    }

    /// Execute `batch` to completion. Errors propagate tagged with the
    /// batch index and their classification; they are never swallowed here.
    pub async fn run_batch(&self, batch: &Batch) -> Result<BatchReport, ClassifiedError> {
        let batch_index = batch.index;

        if self.signal.is_tripped() {
            return Err(ClassifiedError::unretried(OrchestrationError::Aborted {
                batch_index,
            }));
        }

        let executor = RetryExecutor::new(self.config.retry.clone(), Arc::clone(&self.signal));
        let launch = self.submit_copy(&executor, batch).await?;
        let mut retry_count = launch.retry_count;

        match launch.value {
            CopyBatchLaunch::Complete => {
                log_batch_operation(
                    "copy_batch",
                    batch_index,
                    batch.entries.len(),
                    "complete",
                    None,
                );
            }
            CopyBatchLaunch::Async { job_id } => {
                debug!(
                    batch_index = batch_index,
                    job_id = %job_id,
                    "Copy batch accepted as asynchronous job"
                );
                let poll = self.poll_job(&executor, batch_index, job_id).await?;
                retry_count += poll.retry_count;
                log_batch_operation(
                    "copy_batch",
                    batch_index,
                    batch.entries.len(),
                    "complete_async",
                    None,
                );
            }
        }

        Ok(BatchReport {
            batch_index,
            retry_count,
        })
    }

    /// Submit the batch copy request through the retry executor.
    async fn submit_copy(
        &self,
        executor: &RetryExecutor,
        batch: &Batch,
    ) -> Result<RetryOutcome<CopyBatchLaunch>, ClassifiedError> {
        let batch_index = batch.index;
        let client = Arc::clone(&self.client);
        let entries: Arc<[CopyEntry]> = batch.entries.clone().into();

        executor
            .execute(move || {
                let client = Arc::clone(&client);
                let entries = Arc::clone(&entries);
                async move {
                    client
                        .copy_batch(&entries)
                        .await
                        .map_err(|source| OrchestrationError::Storage {
                            batch_index,
                            source,
                        })
                }
            })
            .await
    }

    /// Poll the asynchronous job until it completes, fails, or exceeds the
    /// batch timeout.
    async fn poll_job(
        &self,
        executor: &RetryExecutor,
        batch_index: usize,
        job_id: String,
    ) -> Result<RetryOutcome<()>, ClassifiedError> {
        let client = Arc::clone(&self.client);
        let signal = Arc::clone(&self.signal);
        let poll_interval = self.config.poll_interval;
        let timeout = self.config.batch_timeout;
        let started = Instant::now();

        executor
            .execute(move || {
                let client = Arc::clone(&client);
                let signal = Arc::clone(&signal);
                let job_id = job_id.clone();
                async move {
                    poll_until_settled(
                        client,
                        signal,
                        batch_index,
                        &job_id,
                        poll_interval,
                        started,
                        timeout,
                    )
                    .await
                }
            })
            .await
    }
}

async fn poll_until_settled(
    client: Arc<dyn StorageClient>,
    signal: Arc<AbortSignal>,
    batch_index: usize,
    job_id: &str,
    poll_interval: Duration,
    started: Instant,
    timeout: Duration,
) -> OrchestrationResult<()> {
    loop {
        if started.elapsed() >= timeout {
            return Err(OrchestrationError::BatchTimeout {
                batch_index,
                job_id: job_id.to_string(),
                timeout,
            });
        }

        if signal.sleep(poll_interval).await == SleepOutcome::Aborted {
            return Err(OrchestrationError::Aborted { batch_index });
        }

        let status = client
            .check_job_status(job_id)
            .await
            .map_err(|source| OrchestrationError::Storage {
                batch_index,
                source,
            })?;

        match status {
            CopyJobStatus::Complete => return Ok(()),
            CopyJobStatus::InProgress => {
                debug!(
                    batch_index = batch_index,
                    job_id = %job_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Copy job still in progress"
                );
            }
            CopyJobStatus::Failed { reason } => {
                return Err(OrchestrationError::CopyJobFailed {
                    batch_index,
                    job_id: job_id.to_string(),
                    reason,
                });
            }
        }
    }
}
