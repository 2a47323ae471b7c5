//! Download events - discriminated unions for download state changes.
//!
//! Two directions:
//! - [`TransferEvent`] flows from the downloader into the coordinator.
//! - [`DownloadEvent`] flows from the coordinator out to listeners (UI).

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;
use super::types::{DownloadRecord, DownloadState, LeaseId, Priority, TaskId, clamp_fraction};
use crate::domain::StorageAction;

/// Status carried by a [`ProgressUpdate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Waiting in the queue.
    Queued,
    /// Currently being downloaded.
    Downloading,
    /// Paused by the user.
    Paused,
    /// Completed successfully.
    Completed,
    /// Failed with an error.
    Failed,
    /// Cancelled by the user.
    Cancelled,
}

impl From<DownloadState> for ProgressStatus {
    fn from(state: DownloadState) -> Self {
        match state {
            DownloadState::Pending => Self::Queued,
            DownloadState::Downloading => Self::Downloading,
            DownloadState::Paused => Self::Paused,
            DownloadState::Completed => Self::Completed,
            DownloadState::Failed => Self::Failed,
            DownloadState::Cancelled => Self::Cancelled,
        }
    }
}

/// Progress notification republished to UI listeners.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Episode the update is about.
    pub episode_id: String,
    /// Fraction completed, clamped to `[0, 1]`.
    pub fraction_completed: f64,
    /// Status after the change.
    pub status: ProgressStatus,
    /// Optional detail (error message for failures).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressUpdate {
    /// Create an update; the fraction is clamped.
    pub fn new(episode_id: impl Into<String>, fraction: f64, status: ProgressStatus) -> Self {
        Self {
            episode_id: episode_id.into(),
            fraction_completed: clamp_fraction(fraction),
            status,
            message: None,
        }
    }

    /// Build an update reflecting the current state of a record.
    #[must_use]
    pub fn from_record(record: &DownloadRecord) -> Self {
        let mut update = Self::new(
            record.task.episode_id.clone(),
            record.progress,
            record.state.into(),
        );
        if record.state == DownloadState::Failed {
            update.message.clone_from(&record.last_error);
        }
        update
    }

    /// Attach a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A summary of a record in the queue (for snapshots and API responses).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadSummary {
    /// Task id.
    pub task_id: TaskId,
    /// Episode id.
    pub episode_id: String,
    /// Human-readable title.
    pub title: String,
    /// Current state.
    pub state: DownloadState,
    /// Scheduling priority.
    pub priority: Priority,
    /// Fraction completed.
    pub progress: f64,
    /// Failed attempts so far.
    pub retry_count: u32,
    /// 0-based position in the visible queue order.
    pub position: usize,
    /// Error message if the record is failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadSummary {
    /// Summarize a record at the given position.
    #[must_use]
    pub fn from_record(record: &DownloadRecord, position: usize) -> Self {
        Self {
            task_id: record.task.id.clone(),
            episode_id: record.task.episode_id.clone(),
            title: record.task.title.clone(),
            state: record.state,
            priority: record.task.priority,
            progress: record.progress,
            retry_count: record.task.retry_count,
            position,
            error: record.last_error.clone(),
        }
    }
}

/// Events published by the coordinator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    /// A record changed state or progress.
    Progress {
        /// The update.
        update: ProgressUpdate,
    },

    /// Snapshot of the visible queue after a change.
    QueueSnapshot {
        /// Records in visible order.
        items: Vec<DownloadSummary>,
    },

    /// A storage action was carried out.
    StorageActionApplied {
        /// The action.
        action: StorageAction,
    },

    /// A storage action failed and was skipped.
    StorageActionFailed {
        /// The action.
        action: StorageAction,
        /// What went wrong.
        error: String,
    },
}

impl DownloadEvent {
    /// Wrap a progress update.
    #[must_use]
    pub const fn progress(update: ProgressUpdate) -> Self {
        Self::Progress { update }
    }

    /// Progress update carried by this event, if any.
    #[must_use]
    pub const fn as_progress(&self) -> Option<&ProgressUpdate> {
        match self {
            Self::Progress { update } => Some(update),
            _ => None,
        }
    }
}

/// What happened to a transfer.
#[derive(Clone, Debug, PartialEq)]
pub enum TransferEventKind {
    /// Bytes arrived; `fraction` is whatever the downloader reported.
    Progress {
        /// Reported fraction (not yet clamped).
        fraction: f64,
    },
    /// The transfer finished.
    Completed {
        /// Where the file ended up.
        local_file: Option<String>,
    },
    /// The transfer failed.
    Failed {
        /// The underlying error.
        error: DownloadError,
    },
}

/// An event reported by the downloader for one transfer attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferEvent {
    /// Task the transfer belongs to.
    pub task_id: TaskId,
    /// Transfer attempt that produced the event.
    pub lease: LeaseId,
    /// Payload.
    pub kind: TransferEventKind,
}

impl TransferEvent {
    /// Whether this event ends the transfer.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            TransferEventKind::Completed { .. } | TransferEventKind::Failed { .. }
        )
    }
}
