//! # Batch Copy Coordinator
//!
//! ## Architecture: Staged Parallel Orchestration
//!
//! The BatchCopyCoordinator is the engine that copies a large file list into
//! a remote staging folder. It partitions the list into at most
//! `parallel_batch_count` batches, launches every batch concurrently with
//! staggered start offsets, and computes one aggregate verdict after all
//! batches have settled.
//!
//! ## Key Responsibilities
//!
//! - **Partitioning**: derive the per-batch size and delegate to the chunker
//! - **Staggered launch**: delay batch *i* by `i * batch_stagger` plus jitter
//!   so concurrent batches do not hit the remote service in lockstep
//! - **Never-reject join**: every batch task resolves to a [`BatchOutcome`]
//!   value; failures are captured as data so sibling batches always run to
//!   completion
//! - **Fatal escalation**: the first fatal outcome trips the shared abort
//!   signal, remaining batches settle as aborted, and the operation raises
//! - **Verdict**: after full settlement, compare the failure count against
//!   `floor(total_batches * max_failure_rate)`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stagehand_core::config::BatchCopyConfig;
//! use stagehand_core::orchestration::coordinator::BatchCopyCoordinator;
//! use stagehand_core::storage::StorageClient;
//! use std::sync::Arc;
//!
//! # async fn example(client: Arc<dyn StorageClient>) -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = BatchCopyCoordinator::new(BatchCopyConfig::default())?;
//! let files = vec!["/datasets/a/file1.bin".to_string()];
//! let result = coordinator.run(&files, "/staging/request-42", client).await?;
//! println!("{} of {} batches succeeded", result.succeeded, result.total_batches);
//! # Ok(())
//! # }
//! ```

use crate::config::BatchCopyConfig;
use crate::logging::log_copy_operation;
use crate::orchestration::batch_runner::BatchRunner;
use crate::orchestration::chunker::{chunk, ChunkPolicy};
use crate::orchestration::error_classifier::ErrorCategory;
use crate::orchestration::errors::{OrchestrationError, OrchestrationResult};
use crate::orchestration::retry_executor::bounded_jitter;
use crate::orchestration::types::{
    AbortSignal, Batch, BatchOutcome, OperationMetrics, OperationResult, SleepOutcome,
};
use crate::storage::{CopyEntry, StorageClient};
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Orchestrates one staged parallel batch-copy operation per `run` call.
pub struct BatchCopyCoordinator {
    config: Arc<BatchCopyConfig>,
}

impl BatchCopyCoordinator {
    /// Create a coordinator, rejecting invalid configuration up front.
    pub fn new(config: BatchCopyConfig) -> crate::error::Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Copy `files` into the staging folder at `destination`.
    ///
    /// Completes normally when every batch succeeded or when the failure
    /// count stayed within the configured threshold. Raises on a fatal
    /// remote error, an expired operation deadline, or a threshold breach,
    /// always after every scheduled batch task has resolved.
    #[instrument(skip_all, fields(file_count = files.len(), destination = %destination))]
    pub async fn run(
        &self,
        files: &[String],
        destination: &str,
        client: Arc<dyn StorageClient>,
    ) -> OrchestrationResult<OperationResult> {
        let mut metrics = OperationMetrics::started(files.len());

        let entries: Vec<CopyEntry> = files
            .iter()
            .map(|source| copy_entry_for(source, destination))
            .collect();
        let batches = self.partition(entries)?;
        let total_batches = batches.len();

        log_copy_operation("run", files.len(), total_batches, "started", None);

        if batches.is_empty() {
            info!("No files to copy; settling vacuously");
            return Ok(OperationResult {
                total_batches: 0,
                succeeded: 0,
                failed: 0,
                aborted: 0,
                max_allowable_failures: 0,
            });
        }

        let signal = Arc::new(AbortSignal::new());
        let deadline_fired = Arc::new(AtomicBool::new(false));
        let watchdog = self.config.operation_timeout.map(|timeout| {
            let signal = Arc::clone(&signal);
            let deadline_fired = Arc::clone(&deadline_fired);
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                deadline_fired.store(true, Ordering::Release);
                if signal.trip() {
                    warn!(timeout_ms = timeout.as_millis() as u64, "Operation deadline expired; aborting outstanding batches");
                }
            })
        });

        let runner = Arc::new(BatchRunner::new(
            Arc::clone(&self.config),
            client,
            Arc::clone(&signal),
        ));

        let handles: Vec<_> = batches
            .into_iter()
            .map(|batch| {
                let config = Arc::clone(&self.config);
                let runner = Arc::clone(&runner);
                let signal = Arc::clone(&signal);
                tokio::spawn(async move { execute_batch_task(batch, config, runner, signal).await })
            })
            .collect();

        // Full join: every scheduled task resolves to an outcome before any
        // verdict is computed, even after a fatal error.
        let joined = join_all(handles).await;
        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        let outcomes: Vec<BatchOutcome> = joined
            .into_iter()
            .enumerate()
            .map(|(index, joined)| match joined {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    error!(batch_index = index, error = %join_error, "Batch task panicked");
                    BatchOutcome::failed(
                        index,
                        OrchestrationError::TaskPanicked {
                            batch_index: index,
                            reason: join_error.to_string(),
                        },
                        0,
                        false,
                    )
                }
            })
            .collect();

        metrics.settle(&outcomes);
        info!(
            total_batches = metrics.total_batches,
            succeeded = metrics.batches_succeeded,
            failed = metrics.batches_failed,
            aborted = metrics.batches_aborted,
            retries_consumed = metrics.retries_consumed,
            duration_ms = metrics.total_duration.map(|d| d.as_millis() as u64),
            "Batch copy operation settled"
        );

        self.verdict(&metrics, outcomes, &signal, &deadline_fired)
    }

    /// Split `entries` into low-level chunks under the configured
    /// `batch_size` policy.
    ///
    /// This is the utility path for callers that submit their own copy
    /// requests outside a staged run (the unbounded sentinel disables
    /// chunking); `run` itself derives its per-batch size from
    /// `parallel_batch_count`.
    pub fn chunk_entries(&self, entries: &[CopyEntry]) -> OrchestrationResult<Vec<Vec<CopyEntry>>> {
        Ok(chunk(entries, self.config.batch_size)?)
    }

    /// Partition copy entries into at most `parallel_batch_count` batches.
    ///
    /// The per-batch size is `ceil(total / parallel_batch_count)` fed back
    /// into the generic chunker, so certain file-count/parallelism
    /// combinations produce fewer batches than requested (never an empty
    /// batch, never more than requested).
    fn partition(&self, entries: Vec<CopyEntry>) -> OrchestrationResult<Vec<Batch>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let per_batch = entries.len().div_ceil(self.config.parallel_batch_count);
        let chunks = chunk(&entries, ChunkPolicy::Bounded(per_batch))?;

        Ok(chunks
            .into_iter()
            .enumerate()
            .map(|(index, entries)| Batch { index, entries })
            .collect())
    }

    /// Compute the final verdict from the settled outcomes.
    fn verdict(
        &self,
        metrics: &OperationMetrics,
        outcomes: Vec<BatchOutcome>,
        signal: &AbortSignal,
        deadline_fired: &AtomicBool,
    ) -> OrchestrationResult<OperationResult> {
        let total_batches = outcomes.len();

        if let Some(batch_index) = signal.fatal_batch() {
            let reason = outcomes
                .iter()
                .find(|outcome| outcome.batch_index == batch_index)
                .and_then(|outcome| outcome.error.as_ref())
                .map(|error| error.to_string())
                .unwrap_or_else(|| "fatal remote error".to_string());
            log_copy_operation(
                "run",
                metrics.total_files,
                total_batches,
                "aborted",
                Some(&reason),
            );
            return Err(OrchestrationError::FatalAbort {
                batch_index,
                reason,
            });
        }

        if deadline_fired.load(Ordering::Acquire) && metrics.batches_aborted > 0 {
            // The deadline only raises when it actually cut work short; a
            // watchdog firing after full settlement is a no-op.
            return Err(OrchestrationError::OperationTimeout {
                timeout: self.config.operation_timeout.unwrap_or_default(),
                aborted: metrics.batches_aborted,
            });
        }

        let max_allowable_failures =
            (total_batches as f64 * self.config.max_failure_rate).floor() as usize;
        let failed: Vec<&BatchOutcome> = outcomes
            .iter()
            .filter(|outcome| !outcome.success && !outcome.aborted)
            .collect();

        if failed.len() > max_allowable_failures {
            let first_failure = failed
                .first()
                .and_then(|outcome| outcome.error.as_ref())
                .map(|error| error.to_string())
                .unwrap_or_else(|| "unknown failure".to_string());
            log_copy_operation(
                "run",
                metrics.total_files,
                total_batches,
                "failed",
                Some(&first_failure),
            );
            return Err(OrchestrationError::FailureThresholdExceeded {
                failed: failed.len(),
                total_batches,
                max_allowable_failures,
                first_failure,
            });
        }

        log_copy_operation("run", metrics.total_files, total_batches, "succeeded", None);
        Ok(OperationResult {
            total_batches,
            succeeded: metrics.batches_succeeded,
            failed: failed.len(),
            aborted: metrics.batches_aborted,
            max_allowable_failures,
        })
    }
}

/// One batch task: staggered start, abort observation, and conversion of
/// every possible ending into a [`BatchOutcome`] value. This function never
/// returns an error, which is what keeps the aggregate join from
/// fail-fasting.
async fn execute_batch_task(
    batch: Batch,
    config: Arc<BatchCopyConfig>,
    runner: Arc<BatchRunner>,
    signal: Arc<AbortSignal>,
) -> BatchOutcome {
    let batch_index = batch.index;
    let stagger = config.batch_stagger.saturating_mul(batch_index as u32)
        + bounded_jitter(config.retry.jitter_max);

    if signal.sleep(stagger).await == SleepOutcome::Aborted {
        info!(batch_index = batch_index, "Batch aborted before start");
        return BatchOutcome::aborted(batch_index);
    }

    match runner.run_batch(&batch).await {
        Ok(report) => BatchOutcome::succeeded(batch_index, report.retry_count),
        Err(failure) => {
            let fatal = failure.category == ErrorCategory::Fatal;
            if fatal && signal.trip_for_batch(batch_index) {
                error!(
                    batch_index = batch_index,
                    error = %failure.error,
                    "Fatal remote error; tripping operation abort signal"
                );
            }
            match failure.error {
                OrchestrationError::Aborted { .. } => BatchOutcome::aborted(batch_index),
                error => {
                    warn!(
                        batch_index = batch_index,
                        error = %error,
                        retry_count = failure.retry_count,
                        fatal = fatal,
                        "Batch failed"
                    );
                    BatchOutcome::failed(batch_index, error, failure.retry_count, fatal)
                }
            }
        }
    }
}

/// Build one copy instruction targeting the staging folder.
fn copy_entry_for(source: &str, destination: &str) -> CopyEntry {
    let name = source.rsplit('/').next().unwrap_or(source);
    CopyEntry::new(source, format!("{}/{name}", destination.trim_end_matches('/')))
}
