//! # Remote Storage Client Boundary
//!
//! Typed interface to the remote file-storage service that performs the
//! actual batch copies. The orchestration core never inspects loose error
//! payloads: every remote failure crosses this boundary as a [`StorageError`]
//! with a numeric status and a structured conflict reason, produced by
//! whatever concrete client adapts the wire protocol.
//!
//! ## Contract
//!
//! - [`StorageClient::copy_batch`] submits one batch of copy instructions and
//!   reports either immediate completion or a handle to an asynchronous
//!   remote job.
//! - [`StorageClient::check_job_status`] polls an asynchronous job until it
//!   settles.
//!
//! Implementations are expected to rely on the remote service's own
//! idempotency/autorename behavior; the orchestration core may re-invoke
//! `copy_batch` for the same entries after a transient failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One file's copy instruction: absolute source path to absolute
/// destination path inside the staging folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyEntry {
    pub from_path: String,
    pub to_path: String,
}

impl CopyEntry {
    pub fn new(from_path: impl Into<String>, to_path: impl Into<String>) -> Self {
        Self {
            from_path: from_path.into(),
            to_path: to_path.into(),
        }
    }
}

/// Outcome of submitting a batch copy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyBatchLaunch {
    /// The remote service completed the copy synchronously.
    Complete,
    /// The remote service accepted the batch as a long-running job that
    /// must be polled via [`StorageClient::check_job_status`].
    Async { job_id: String },
}

/// Status of an asynchronous remote copy job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyJobStatus {
    Complete,
    InProgress,
    Failed { reason: String },
}

/// Machine-readable reason attached to an HTTP 409 conflict response.
///
/// The first four variants are permanent conditions the remote service will
/// never resolve on its own; everything else is ordinary write contention
/// worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    InvalidCursor,
    DisallowedName,
    InsufficientSpace,
    InternalError,
    PathConflict,
    TooManyFiles,
    DuplicatedOrNestedPaths,
    Other(String),
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictReason::InvalidCursor => write!(f, "invalid_cursor"),
            ConflictReason::DisallowedName => write!(f, "disallowed_name"),
            ConflictReason::InsufficientSpace => write!(f, "insufficient_space"),
            ConflictReason::InternalError => write!(f, "internal_error"),
            ConflictReason::PathConflict => write!(f, "path_conflict"),
            ConflictReason::TooManyFiles => write!(f, "too_many_files"),
            ConflictReason::DuplicatedOrNestedPaths => write!(f, "duplicated_or_nested_paths"),
            ConflictReason::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// Errors raised by a [`StorageClient`] implementation.
///
/// Variants carry everything the retry classifier needs, so classification
/// never falls back to string matching.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    /// HTTP 429. `retry_after` carries the server-advertised delay when the
    /// response included one.
    #[error("rate limited by remote service (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// HTTP 409 with a structured conflict reason.
    #[error("copy conflict: {reason}")]
    Conflict { reason: ConflictReason },

    /// Any other HTTP status the client did not model more precisely.
    #[error("remote service returned status {status}: {message}")]
    Http { status: u16, message: String },

    /// The transport timed out before a response arrived.
    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    /// The connection was reset mid-request.
    #[error("connection reset: {0}")]
    ConnectionReset(String),
}

/// Remote file-storage service operations consumed by the orchestration
/// core. Concrete clients own authentication, transport, and response
/// decoding.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Submit one batch of copy instructions.
    async fn copy_batch(&self, entries: &[CopyEntry]) -> Result<CopyBatchLaunch, StorageError>;

    /// Query the status of an asynchronous copy job previously returned by
    /// [`copy_batch`](Self::copy_batch).
    async fn check_job_status(&self, job_id: &str) -> Result<CopyJobStatus, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_reason_display_matches_wire_tags() {
        assert_eq!(ConflictReason::InternalError.to_string(), "internal_error");
        assert_eq!(ConflictReason::InvalidCursor.to_string(), "invalid_cursor");
        assert_eq!(
            ConflictReason::Other("cant_copy_shared_folder".to_string()).to_string(),
            "cant_copy_shared_folder"
        );
    }

    #[test]
    fn test_storage_error_display_includes_status() {
        let err = StorageError::Http {
            status: 503,
            message: "service unavailable".to_string(),
        };
        assert!(err.to_string().contains("503"));
    }
}
