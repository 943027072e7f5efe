#![allow(clippy::doc_markdown)] // Allow technical terms like HTTP, JSON in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Stagehand Core
//!
//! High-performance Rust core for staged parallel batch-copy orchestration:
//! takes an arbitrary-sized list of remote file references and copies them,
//! in parallel, into a temporary staging folder of a remote file-storage
//! service, tolerating partial failures, rate limiting, and one class of
//! unrecoverable remote error.
//!
//! ## Architecture
//!
//! One `run` call fans out into at most `parallel_batch_count` concurrently
//! running batch tasks with staggered start offsets. Every remote operation
//! is wrapped in bounded retry with exponential backoff and jitter;
//! asynchronous remote jobs are polled with a per-batch timeout. Batch
//! failures are captured as data and never short-circuit sibling batches:
//! the aggregate verdict is computed only after every batch has settled,
//! against a configurable failure-rate threshold. A single fatal remote
//! condition trips a shared abort signal that stops all further remote work.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - coordinator, batch runner, retry executor, chunker
//! - [`storage`] - typed remote storage client boundary
//! - [`config`] - per-operation immutable configuration
//! - [`error`] - crate-level error handling
//! - [`logging`] - structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stagehand_core::{BatchCopyConfig, BatchCopyCoordinator};
//! use stagehand_core::storage::StorageClient;
//! use std::sync::Arc;
//!
//! # async fn example(client: Arc<dyn StorageClient>) -> Result<(), Box<dyn std::error::Error>> {
//! stagehand_core::logging::init_structured_logging();
//!
//! let coordinator = BatchCopyCoordinator::new(BatchCopyConfig::from_env()?)?;
//! let files: Vec<String> = (0..1000).map(|i| format!("/datasets/a/file{i}.bin")).collect();
//!
//! // Raises on a fatal remote error or a breached failure threshold;
//! // returns the settled counts otherwise.
//! let result = coordinator.run(&files, "/staging/request-42", client).await?;
//! println!("{}/{} batches succeeded", result.succeeded, result.total_batches);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod orchestration;
pub mod storage;

pub use config::{BatchCopyConfig, RetryConfig};
pub use error::{Result, StagehandError};
pub use orchestration::{
    chunk, AbortSignal, Batch, BatchCopyCoordinator, BatchOutcome, ChunkPolicy, ErrorCategory,
    OperationResult, OrchestrationError, OrchestrationResult, RetryExecutor,
};
pub use storage::{
    ConflictReason, CopyBatchLaunch, CopyEntry, CopyJobStatus, StorageClient, StorageError,
};
