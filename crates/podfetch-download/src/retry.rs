//! Automatic retry of failed transfers.
//!
//! [`RetryPolicy`] is the pure half: it maps a failure count to a delay from a
//! fixed backoff table. [`RetryScheduler`] is the side effect: it sleeps for
//! that delay and then hands the task id back to the coordinator, which
//! decides whether the retry still applies.

use std::time::Duration;

use podfetch_core::download::TaskId;
use podfetch_core::settings::{DownloadSettings, MAX_RETRY_COUNT, RETRY_DELAYS_SECS};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Retry budget and backoff table.
///
/// # Delay Calculation
///
/// ```text
/// delay = delays[min(attempt, delays.len() - 1)]
/// ```
///
/// With defaults the first three retries wait 5s, 15s and 60s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    max_retry_count: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: RETRY_DELAYS_SECS
                .iter()
                .copied()
                .map(Duration::from_secs)
                .collect(),
            max_retry_count: MAX_RETRY_COUNT,
        }
    }
}

impl RetryPolicy {
    /// Create a policy. An empty table falls back to the default delays.
    #[must_use]
    pub fn new(delays: Vec<Duration>, max_retry_count: u32) -> Self {
        if delays.is_empty() {
            return Self {
                max_retry_count,
                ..Self::default()
            };
        }
        Self {
            delays,
            max_retry_count,
        }
    }

    /// Build the policy described by `settings`.
    #[must_use]
    pub fn from_settings(settings: &DownloadSettings) -> Self {
        Self::new(
            settings.effective_retry_delays(),
            settings.effective_max_retry_count(),
        )
    }

    #[must_use]
    pub const fn max_retry_count(&self) -> u32 {
        self.max_retry_count
    }

    /// Delay before the retry following `attempt` (0-based); the last table
    /// entry repeats.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let idx = (attempt as usize).min(self.delays.len().saturating_sub(1));
        self.delays.get(idx).copied().unwrap_or_default()
    }

    /// Whether a task that has failed `retry_count` times gets another
    /// automatic attempt.
    #[must_use]
    pub const fn should_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retry_count
    }
}

/// Fire-and-forget timer that re-submits failed tasks to the coordinator.
///
/// Every scheduled retry is a one-shot tokio task. When it fires it sends the
/// task id on the retry channel; whether the task is still failed is checked
/// on the receiving side, so a retry for a removed or cancelled task is a
/// harmless no-op.
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    policy: RetryPolicy,
    tx: mpsc::UnboundedSender<TaskId>,
    cancel: CancellationToken,
}

impl RetryScheduler {
    /// Create a scheduler that delivers wake-ups on `tx` until `cancel` fires.
    #[must_use]
    pub const fn new(
        policy: RetryPolicy,
        tx: mpsc::UnboundedSender<TaskId>,
        cancel: CancellationToken,
    ) -> Self {
        Self { policy, tx, cancel }
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Schedule a retry of `task_id` after `delay_for(attempt)`.
    ///
    /// Returns the delay that was scheduled.
    pub fn schedule_retry(&self, task_id: TaskId, attempt: u32) -> Duration {
        let delay = self.policy.delay_for(attempt);
        let deadline = tokio::time::Instant::now() + delay;
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();

        tracing::info!(
            task_id = %task_id,
            attempt,
            delay_secs = delay.as_secs(),
            "Retry scheduled"
        );

        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!(task_id = %task_id, "Retry timer cancelled");
                }
                () = tokio::time::sleep_until(deadline) => {
                    if tx.send(task_id).is_err() {
                        tracing::debug!("Retry fired after coordinator shut down");
                    }
                }
            }
        });

        delay
    }
}
