//! # Orchestration Engine
//!
//! Staged parallel batch-copy orchestration core.
//!
//! ## Core Components
//!
//! - **BatchCopyCoordinator**: partitions the file list, launches batches
//!   concurrently with staggered starts, and computes the aggregate verdict
//! - **BatchRunner**: executes one batch's copy request, including polling
//!   asynchronous remote jobs to completion
//! - **RetryExecutor**: bounded retry with exponential backoff and jitter
//!   around every remote operation
//! - **Chunker**: pure, order-preserving partitioning under a size policy
//! - **Error classification**: retryable / terminal / fatal triage of typed
//!   storage errors
//!
//! Control flow: coordinator → chunker → N × batch runner → retry executor
//! → storage client.

pub mod batch_runner;
pub mod chunker;
pub mod coordinator;
pub mod error_classifier;
pub mod errors;
pub mod retry_executor;
pub mod types;

pub use batch_runner::{BatchReport, BatchRunner};
pub use chunker::{chunk, ChunkPolicy};
pub use coordinator::BatchCopyCoordinator;
pub use error_classifier::{classify, classify_storage, Classification, ErrorCategory};
pub use errors::{OrchestrationError, OrchestrationResult};
pub use retry_executor::{ClassifiedError, RetryExecutor, RetryOutcome};
pub use types::{
    AbortSignal, Batch, BatchOutcome, OperationMetrics, OperationResult, SleepOutcome,
};
