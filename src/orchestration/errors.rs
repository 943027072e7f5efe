//! # Orchestration Errors
//!
//! Error taxonomy for the batch-copy orchestration core. Batch-level errors
//! carry the index of the batch that raised them; only
//! [`OrchestrationError::FatalAbort`], [`OrchestrationError::OperationTimeout`],
//! and [`OrchestrationError::FailureThresholdExceeded`] ever escape the
//! top-level `run` call.

use crate::error::StagehandError;
use crate::storage::StorageError;
use std::time::Duration;
use thiserror::Error;

pub type OrchestrationResult<T> = anyhow::Result<T, OrchestrationError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestrationError {
    /// A remote storage request failed after exhausting its retry budget or
    /// hitting a non-retryable condition.
    #[error("storage request for batch {batch_index} failed: {source}")]
    Storage {
        batch_index: usize,
        #[source]
        source: StorageError,
    },

    /// The batch observed the shared abort signal before completing.
    #[error("batch {batch_index} aborted before completion")]
    Aborted { batch_index: usize },

    /// The batch's asynchronous copy job did not settle within the
    /// configured budget.
    #[error("batch {batch_index} timed out after {timeout:?} waiting on copy job {job_id}")]
    BatchTimeout {
        batch_index: usize,
        job_id: String,
        timeout: Duration,
    },

    /// The remote service reported the asynchronous copy job as failed.
    #[error("copy job {job_id} for batch {batch_index} failed: {reason}")]
    CopyJobFailed {
        batch_index: usize,
        job_id: String,
        reason: String,
    },

    /// A batch task panicked; converted to a failed outcome so the
    /// aggregate join never rejects.
    #[error("batch {batch_index} task panicked: {reason}")]
    TaskPanicked { batch_index: usize, reason: String },

    /// A batch hit the fatal remote condition and the whole operation was
    /// aborted.
    #[error("operation aborted: batch {batch_index} hit a fatal remote error: {reason}")]
    FatalAbort { batch_index: usize, reason: String },

    /// The operation deadline expired and aborted outstanding batches.
    #[error("operation timed out after {timeout:?} with {aborted} batch(es) aborted")]
    OperationTimeout { timeout: Duration, aborted: usize },

    /// Too many batches failed non-fatally after full settlement.
    #[error(
        "failure threshold exceeded: {failed} of {total_batches} batches failed \
         (allowed {max_allowable_failures}); first failure: {first_failure}"
    )]
    FailureThresholdExceeded {
        failed: usize,
        total_batches: usize,
        max_allowable_failures: usize,
        first_failure: String,
    },

    /// Invalid configuration or partitioning input.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl From<StagehandError> for OrchestrationError {
    fn from(err: StagehandError) -> Self {
        OrchestrationError::Configuration {
            reason: err.to_string(),
        }
    }
}
