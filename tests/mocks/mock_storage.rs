//! Mock Storage Client for Testing
//!
//! Provides a scripted implementation of the StorageClient trait for
//! exercising the orchestration core without a real remote service.
//!
//! Behavior is keyed by the first entry's source path of each submitted
//! batch, which is deterministic because the chunker preserves input order.

use async_trait::async_trait;
use stagehand_core::storage::{
    CopyBatchLaunch, CopyEntry, CopyJobStatus, StorageClient, StorageError,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// One recorded copy_batch invocation.
#[derive(Debug, Clone)]
pub struct CopyCall {
    pub first_from_path: String,
    pub entry_count: usize,
    /// Tokio clock timestamp, exact under `start_paused` tests.
    pub started_at: Instant,
}

/// Scripted behavior for an asynchronous copy job.
#[derive(Debug, Clone)]
struct JobScript {
    job_id: String,
    in_progress_polls: u32,
    final_status: CopyJobStatus,
}

#[derive(Debug, Default)]
struct MockStorageState {
    copy_calls: Vec<CopyCall>,
    status_calls: Vec<String>,
    /// Errors consumed front-first per batch key; success once drained.
    copy_failure_sequences: HashMap<String, Vec<StorageError>>,
    /// Batches that fail on every invocation.
    copy_failures: HashMap<String, StorageError>,
    /// Batches that launch an asynchronous job instead of completing.
    job_scripts: HashMap<String, JobScript>,
    /// Transient status-check errors consumed front-first per job id.
    status_failure_sequences: HashMap<String, Vec<StorageError>>,
    polls_by_job: HashMap<String, u32>,
}

/// Mock storage client with per-batch scripted behavior.
pub struct MockStorageClient {
    state: Arc<Mutex<MockStorageState>>,
    /// Simulated latency of each copy_batch call.
    copy_delay: Option<Duration>,
}

impl MockStorageClient {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockStorageState::default())),
            copy_delay: None,
        }
    }

    /// Simulate slow copy submissions.
    pub fn with_copy_delay(mut self, delay: Duration) -> Self {
        self.copy_delay = Some(delay);
        self
    }

    /// Fail every copy submission for the batch whose first entry is
    /// `first_from_path`.
    pub fn fail_batch(self, first_from_path: impl Into<String>, error: StorageError) -> Self {
        self.state
            .lock()
            .unwrap()
            .copy_failures
            .insert(first_from_path.into(), error);
        self
    }

    /// Fail the first `errors.len()` copy submissions for a batch, then
    /// succeed.
    pub fn fail_batch_times(
        self,
        first_from_path: impl Into<String>,
        errors: Vec<StorageError>,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .copy_failure_sequences
            .insert(first_from_path.into(), errors);
        self
    }

    /// Make a batch launch an asynchronous job that reports InProgress
    /// `in_progress_polls` times before settling with `final_status`.
    pub fn with_async_job(
        self,
        first_from_path: impl Into<String>,
        job_id: impl Into<String>,
        in_progress_polls: u32,
        final_status: CopyJobStatus,
    ) -> Self {
        self.state.lock().unwrap().job_scripts.insert(
            first_from_path.into(),
            JobScript {
                job_id: job_id.into(),
                in_progress_polls,
                final_status,
            },
        );
        self
    }

    /// Fail the first `errors.len()` status checks for a job, then resume
    /// the scripted statuses.
    pub fn fail_status_times(self, job_id: impl Into<String>, errors: Vec<StorageError>) -> Self {
        self.state
            .lock()
            .unwrap()
            .status_failure_sequences
            .insert(job_id.into(), errors);
        self
    }

    pub fn copy_calls(&self) -> Vec<CopyCall> {
        self.state.lock().unwrap().copy_calls.clone()
    }

    pub fn copy_call_count(&self) -> usize {
        self.state.lock().unwrap().copy_calls.len()
    }

    /// Whether copy_batch was ever invoked for the batch starting with
    /// `first_from_path`.
    pub fn was_copy_called_for(&self, first_from_path: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .copy_calls
            .iter()
            .any(|call| call.first_from_path == first_from_path)
    }

    pub fn status_call_count(&self) -> usize {
        self.state.lock().unwrap().status_calls.len()
    }
}

impl Default for MockStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageClient for MockStorageClient {
    async fn copy_batch(&self, entries: &[CopyEntry]) -> Result<CopyBatchLaunch, StorageError> {
        let key = entries
            .first()
            .map(|entry| entry.from_path.clone())
            .unwrap_or_default();

        {
            let mut state = self.state.lock().unwrap();
            state.copy_calls.push(CopyCall {
                first_from_path: key.clone(),
                entry_count: entries.len(),
                started_at: Instant::now(),
            });
        }

        if let Some(delay) = self.copy_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();

        if let Some(errors) = state.copy_failure_sequences.get_mut(&key) {
            if !errors.is_empty() {
                return Err(errors.remove(0));
            }
        }

        if let Some(error) = state.copy_failures.get(&key) {
            return Err(error.clone());
        }

        if let Some(script) = state.job_scripts.get(&key) {
            return Ok(CopyBatchLaunch::Async {
                job_id: script.job_id.clone(),
            });
        }

        Ok(CopyBatchLaunch::Complete)
    }

    async fn check_job_status(&self, job_id: &str) -> Result<CopyJobStatus, StorageError> {
        let mut state = self.state.lock().unwrap();
        state.status_calls.push(job_id.to_string());

        if let Some(errors) = state.status_failure_sequences.get_mut(job_id) {
            if !errors.is_empty() {
                return Err(errors.remove(0));
            }
        }

        let polls = state.polls_by_job.entry(job_id.to_string()).or_insert(0);
        *polls += 1;
        let polls = *polls;

        let script = state
            .job_scripts
            .values()
            .find(|script| script.job_id == job_id)
            .cloned();

        match script {
            Some(script) if polls <= script.in_progress_polls => Ok(CopyJobStatus::InProgress),
            Some(script) => Ok(script.final_status),
            None => Ok(CopyJobStatus::Complete),
        }
    }
}
