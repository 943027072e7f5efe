//! # Copy Error Classification
//!
//! Determines how the retry executor and the coordinator react to a failed
//! remote operation.
//!
//! ## Overview
//!
//! Every error is sorted into exactly one of three categories:
//!
//! - **Retryable**: rate limiting, most conflicts, server errors, and
//!   network interruptions, retried with backoff until the budget runs out.
//! - **Terminal**: ends the batch immediately and counts toward the
//!   failure-rate threshold without affecting sibling batches.
//! - **Fatal**: the remote `internal_error` conflict, which ends the batch
//!   *and* escalates to a global abort of the whole operation.
//!
//! Classification works purely on the typed [`StorageError`] produced at the
//! storage-client boundary; no string matching on loose payloads.

use crate::orchestration::errors::OrchestrationError;
use crate::storage::{ConflictReason, StorageError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Primary error categories driving retry and abort decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// May succeed on retry.
    Retryable,
    /// Permanent for this batch; does not affect other batches.
    Terminal,
    /// Permanent for the whole operation; triggers the global abort.
    Fatal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Retryable => write!(f, "Retryable"),
            ErrorCategory::Terminal => write!(f, "Terminal"),
            ErrorCategory::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Result of classifying one error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: ErrorCategory,
    /// The failure was a rate limit; selects the rate-limit delay path.
    pub rate_limited: bool,
    /// Server-advertised retry-after, when the response carried one.
    pub retry_after: Option<Duration>,
}

impl Classification {
    fn terminal() -> Self {
        Self {
            category: ErrorCategory::Terminal,
            rate_limited: false,
            retry_after: None,
        }
    }

    fn retryable() -> Self {
        Self {
            category: ErrorCategory::Retryable,
            rate_limited: false,
            retry_after: None,
        }
    }

    fn fatal() -> Self {
        Self {
            category: ErrorCategory::Fatal,
            rate_limited: false,
            retry_after: None,
        }
    }
}

/// Classify an orchestration-level error.
///
/// Everything that is not a storage failure (abort, batch timeout, job
/// failure, panic) is Terminal: it ends the batch but is never retried and
/// never escalates on its own.
pub fn classify(error: &OrchestrationError) -> Classification {
    match error {
        OrchestrationError::Storage { source, .. } => classify_storage(source),
        _ => Classification::terminal(),
    }
}

/// Classify a typed storage-client error.
pub fn classify_storage(error: &StorageError) -> Classification {
    match error {
        StorageError::RateLimited { retry_after } => Classification {
            category: ErrorCategory::Retryable,
            rate_limited: true,
            retry_after: *retry_after,
        },
        StorageError::Conflict { reason } => classify_conflict(reason),
        StorageError::Http { status, .. } => {
            if *status >= 500 {
                Classification::retryable()
            } else {
                Classification::terminal()
            }
        }
        StorageError::NetworkTimeout(_) | StorageError::ConnectionReset(_) => {
            Classification::retryable()
        }
    }
}

/// Conflict triage: a fixed deny list of permanent reasons, with
/// `internal_error` escalating to Fatal. All other conflict reasons are
/// ordinary write contention and stay retryable.
fn classify_conflict(reason: &ConflictReason) -> Classification {
    match reason {
        ConflictReason::InternalError => Classification::fatal(),
        ConflictReason::InvalidCursor
        | ConflictReason::DisallowedName
        | ConflictReason::InsufficientSpace => Classification::terminal(),
        ConflictReason::PathConflict
        | ConflictReason::TooManyFiles
        | ConflictReason::DuplicatedOrNestedPaths
        | ConflictReason::Other(_) => Classification::retryable(),
    }
}
