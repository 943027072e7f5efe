//! # Core Orchestration Types
//!
//! Data model shared across the chunker, batch runner, and coordinator.
//! Everything here is created fresh per operation and discarded at the end;
//! the only values shared across concurrent batch tasks are the
//! [`AbortSignal`] and the outcome collection assembled at the join.

use crate::orchestration::errors::OrchestrationError;
use crate::storage::CopyEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::Notify;

/// One ordered sub-list of copy instructions processed as a unit.
///
/// The index is stable and used for logging and error attribution only;
/// batches may complete in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub index: usize,
    pub entries: Vec<CopyEntry>,
}

/// Final state of one batch. Produced exactly once per batch, including for
/// batches that never started.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub batch_index: usize,
    pub success: bool,
    pub aborted: bool,
    pub fatal: bool,
    pub error: Option<OrchestrationError>,
    pub retry_count: u32,
}

impl BatchOutcome {
    pub fn succeeded(batch_index: usize, retry_count: u32) -> Self {
        Self {
            batch_index,
            success: true,
            aborted: false,
            fatal: false,
            error: None,
            retry_count,
        }
    }

    pub fn failed(
        batch_index: usize,
        error: OrchestrationError,
        retry_count: u32,
        fatal: bool,
    ) -> Self {
        Self {
            batch_index,
            success: false,
            aborted: false,
            fatal,
            error: Some(error),
            retry_count,
        }
    }

    pub fn aborted(batch_index: usize) -> Self {
        Self {
            batch_index,
            success: false,
            aborted: true,
            fatal: false,
            error: None,
            retry_count: 0,
        }
    }
}

/// Aggregate verdict data for one settled operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub total_batches: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted: usize,
    pub max_allowable_failures: usize,
}

/// Wall-clock metrics for one operation, logged at settlement.
#[derive(Debug, Clone)]
pub struct OperationMetrics {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_duration: Option<Duration>,
    pub total_files: usize,
    pub total_batches: usize,
    pub batches_succeeded: usize,
    pub batches_failed: usize,
    pub batches_aborted: usize,
    pub retries_consumed: u32,
}

impl OperationMetrics {
    pub fn started(total_files: usize) -> Self {
        Self {
            started_at: Utc::now(),
            completed_at: None,
            total_duration: None,
            total_files,
            total_batches: 0,
            batches_succeeded: 0,
            batches_failed: 0,
            batches_aborted: 0,
            retries_consumed: 0,
        }
    }

    pub fn settle(&mut self, outcomes: &[BatchOutcome]) {
        let completed_at = Utc::now();
        self.total_duration = (completed_at - self.started_at).to_std().ok();
        self.completed_at = Some(completed_at);
        self.total_batches = outcomes.len();
        self.batches_succeeded = outcomes.iter().filter(|o| o.success).count();
        self.batches_aborted = outcomes.iter().filter(|o| o.aborted).count();
        self.batches_failed = outcomes
            .iter()
            .filter(|o| !o.success && !o.aborted)
            .count();
        self.retries_consumed = outcomes.iter().map(|o| o.retry_count).sum();
    }
}

/// Outcome of a cancellation-aware sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    Completed,
    Aborted,
}

/// Shared abort flag for one operation: write-once-to-true, many readers.
///
/// The first fatal batch wins the transition via compare-and-swap and is
/// recorded so the coordinator can name it when raising. Trips wake every
/// in-flight [`AbortSignal::sleep`] immediately, which is how stagger,
/// backoff, and poll delays observe cancellation without polling the flag.
#[derive(Debug, Default)]
pub struct AbortSignal {
    tripped: AtomicBool,
    fatal_batch: OnceLock<usize>,
    notify: Notify,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the signal without attributing it to a batch (operation
    /// deadline). Returns whether this call performed the transition.
    pub fn trip(&self) -> bool {
        let won = self
            .tripped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.notify.notify_waiters();
        }
        won
    }

    /// Trip the signal on behalf of a fatally failed batch. Returns whether
    /// this batch won the transition; losers settle as ordinary outcomes.
    pub fn trip_for_batch(&self, batch_index: usize) -> bool {
        let won = self.trip();
        if won {
            let _ = self.fatal_batch.set(batch_index);
        }
        won
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Index of the batch whose fatal error tripped the signal, if any.
    pub fn fatal_batch(&self) -> Option<usize> {
        self.fatal_batch.get().copied()
    }

    /// Sleep that ends early when the signal trips. Used for every delay in
    /// the engine so no scheduled wait outlives an aborted operation.
    pub async fn sleep(&self, duration: Duration) -> SleepOutcome {
        if self.is_tripped() {
            return SleepOutcome::Aborted;
        }

        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register interest before re-checking so a trip between the first
        // check and registration is not missed.
        notified.as_mut().enable();
        if self.is_tripped() {
            return SleepOutcome::Aborted;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => SleepOutcome::Completed,
            _ = &mut notified => SleepOutcome::Aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_trip_is_write_once() {
        let signal = AbortSignal::new();
        assert!(!signal.is_tripped());
        assert!(signal.trip_for_batch(3));
        assert!(signal.is_tripped());
        assert!(!signal.trip_for_batch(4));
        assert_eq!(signal.fatal_batch(), Some(3));
    }

    #[test]
    fn test_deadline_trip_has_no_fatal_batch() {
        let signal = AbortSignal::new();
        assert!(signal.trip());
        assert_eq!(signal.fatal_batch(), None);
        // A later fatal batch cannot claim an already-tripped signal.
        assert!(!signal.trip_for_batch(1));
        assert_eq!(signal.fatal_batch(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_trip() {
        let signal = AbortSignal::new();
        assert_eq!(
            signal.sleep(Duration::from_millis(50)).await,
            SleepOutcome::Completed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_is_interrupted_by_trip() {
        let signal = Arc::new(AbortSignal::new());
        let sleeper = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.sleep(Duration::from_secs(3600)).await })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        signal.trip();

        let outcome = sleeper.await.expect("sleeper task");
        assert_eq!(outcome, SleepOutcome::Aborted);
    }

    #[tokio::test]
    async fn test_sleep_after_trip_returns_immediately() {
        let signal = AbortSignal::new();
        signal.trip();
        assert_eq!(
            signal.sleep(Duration::from_secs(3600)).await,
            SleepOutcome::Aborted
        );
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = BatchOutcome::succeeded(1, 2);
        assert!(ok.success && !ok.aborted && !ok.fatal);
        assert_eq!(ok.retry_count, 2);

        let aborted = BatchOutcome::aborted(4);
        assert!(!aborted.success && aborted.aborted);
        assert!(aborted.error.is_none());

        let failed = BatchOutcome::failed(
            2,
            OrchestrationError::Aborted { batch_index: 2 },
            1,
            true,
        );
        assert!(failed.fatal);
        assert!(failed.error.is_some());
    }

    #[test]
    fn test_metrics_settlement_counts() {
        let mut metrics = OperationMetrics::started(10);
        let outcomes = vec![
            BatchOutcome::succeeded(0, 1),
            BatchOutcome::succeeded(1, 0),
            BatchOutcome::failed(2, OrchestrationError::Aborted { batch_index: 2 }, 2, false),
            BatchOutcome::aborted(3),
        ];
        metrics.settle(&outcomes);
        assert_eq!(metrics.total_batches, 4);
        assert_eq!(metrics.batches_succeeded, 2);
        assert_eq!(metrics.batches_failed, 1);
        assert_eq!(metrics.batches_aborted, 1);
        assert_eq!(metrics.retries_consumed, 3);
        assert!(metrics.completed_at.is_some());
    }
}
