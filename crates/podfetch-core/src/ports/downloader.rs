//! Downloader port definition.
//!
//! The downloader performs the actual byte transfer for one task at a time.
//! It is an external collaborator: the coordinator only hands it tasks and
//! listens to the events it reports through a [`TransferEventSink`].
//!
//! # Contract
//!
//! - `start` kicks off a transfer. The sink then receives any number of
//!   progress reports followed by exactly one terminal report
//!   (`completed` or `failed`).
//! - `cancel` and `pause` are best-effort signals; the coordinator does not
//!   wait for an acknowledgement. Both carry the lease of the transfer they
//!   target, and may arrive after a newer transfer of the same task has been
//!   started. Backends must ignore a signal whose lease is not the one their
//!   current transfer was started with.
//! - `delete_artifact` removes the downloaded file for a task.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::download::{
    DownloadError, DownloadTask, LeaseId, TaskId, TransferEvent, TransferEventKind,
};

/// Handle a downloader uses to report events for one transfer attempt.
///
/// Every event is stamped with the task id and the lease of the attempt, so
/// the coordinator can ignore reports from superseded transfers. Reports sent
/// after the coordinator has shut down are dropped silently.
#[derive(Debug, Clone)]
pub struct TransferEventSink {
    task_id: TaskId,
    lease: LeaseId,
    tx: mpsc::UnboundedSender<TransferEvent>,
}

impl TransferEventSink {
    /// Create a sink for one transfer attempt.
    pub const fn new(
        task_id: TaskId,
        lease: LeaseId,
        tx: mpsc::UnboundedSender<TransferEvent>,
    ) -> Self {
        Self { task_id, lease, tx }
    }

    /// Task this sink reports for.
    pub const fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Lease of the transfer attempt.
    pub const fn lease(&self) -> LeaseId {
        self.lease
    }

    /// Report transfer progress as a fraction of the total.
    ///
    /// Values outside `[0, 1]` are accepted; the coordinator clamps them.
    pub fn progress(&self, fraction: f64) {
        self.send(TransferEventKind::Progress { fraction });
    }

    /// Report successful completion.
    pub fn completed(&self, local_file: Option<String>) {
        self.send(TransferEventKind::Completed { local_file });
    }

    /// Report a failed transfer.
    pub fn failed(&self, error: DownloadError) {
        self.send(TransferEventKind::Failed { error });
    }

    fn send(&self, kind: TransferEventKind) {
        let event = TransferEvent {
            task_id: self.task_id.clone(),
            lease: self.lease,
            kind,
        };
        if self.tx.send(event).is_err() {
            tracing::trace!(task_id = %self.task_id, "Transfer event dropped, coordinator gone");
        }
    }
}

/// Port for the transfer backend.
#[async_trait]
pub trait DownloaderPort: Send + Sync {
    /// Start transferring `task`, reporting through `events`.
    ///
    /// Returning an error means the transfer could not be started at all;
    /// the coordinator treats that like a failed transfer.
    async fn start(
        &self,
        task: DownloadTask,
        events: TransferEventSink,
    ) -> Result<(), DownloadError>;

    /// Best-effort cancellation of the transfer started under `lease`.
    async fn cancel(&self, task_id: &TaskId, lease: LeaseId);

    /// Best-effort suspension of the transfer started under `lease`.
    ///
    /// Backends without resumable transfers can rely on the default, which
    /// simply cancels; the coordinator restarts the task on resume.
    async fn pause(&self, task_id: &TaskId, lease: LeaseId) {
        self.cancel(task_id, lease).await;
    }

    /// Delete the on-disk artifact for a task.
    async fn delete_artifact(&self, task: &DownloadTask) -> Result<(), DownloadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sink_stamps_task_and_lease() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = TransferEventSink::new(TaskId::new("t1"), LeaseId(7), tx);

        sink.progress(0.4);
        sink.completed(Some("/tmp/t1.mp3".to_string()));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.task_id, TaskId::new("t1"));
        assert_eq!(first.lease, LeaseId(7));
        assert!(!first.is_terminal());

        let second = rx.recv().await.unwrap();
        assert!(second.is_terminal());
    }

    #[tokio::test]
    async fn sink_ignores_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = TransferEventSink::new(TaskId::new("t1"), LeaseId(1), tx);

        // Should not panic
        sink.failed(DownloadError::transfer("late"));
    }
}
