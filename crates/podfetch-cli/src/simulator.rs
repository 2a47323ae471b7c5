//! Simulated transfer backend.
//!
//! Stands in for a real HTTP downloader: every transfer reports progress in
//! fixed steps on a timer and then completes, unless its episode was marked
//! as failing, in which case it fails halfway through.
//!
//! Running transfers are keyed by task and tagged with their lease, so a
//! cancel or pause that arrives after a restart leaves the newer transfer
//! alone.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use podfetch_core::download::{DownloadError, DownloadTask, LeaseId, TaskId};
use podfetch_core::ports::{DownloaderPort, TransferEventSink};

/// Number of progress reports per simulated transfer.
const STEPS: u32 = 10;

/// [`DownloaderPort`] that fakes transfers with timers.
pub struct SimulatedDownloader {
    step_interval: Duration,
    failing: HashSet<String>,
    transfers: Mutex<HashMap<TaskId, Transfer>>,
}

struct Transfer {
    lease: LeaseId,
    handle: JoinHandle<()>,
}

impl SimulatedDownloader {
    #[must_use]
    pub fn new(step_interval: Duration) -> Self {
        Self {
            step_interval,
            failing: HashSet::new(),
            transfers: Mutex::new(HashMap::new()),
        }
    }

    /// Make every transfer of these episodes fail.
    #[must_use]
    pub fn failing(mut self, episode_ids: impl IntoIterator<Item = String>) -> Self {
        self.failing.extend(episode_ids);
        self
    }

    /// Path the simulated artifact for `task` would live at.
    #[must_use]
    pub fn artifact_path(task: &DownloadTask) -> String {
        format!("{}/{}.mp3", task.podcast_id, task.episode_id)
    }
}

#[async_trait]
impl DownloaderPort for SimulatedDownloader {
    async fn start(
        &self,
        task: DownloadTask,
        events: TransferEventSink,
    ) -> Result<(), DownloadError> {
        let fails = self.failing.contains(&task.episode_id);
        let interval = self.step_interval;
        let local_file = Self::artifact_path(&task);
        let lease = events.lease();
        tracing::debug!(task_id = %task.id, episode_id = %task.episode_id, fails, "Simulated transfer started");

        let handle = tokio::spawn(async move {
            for step in 1..STEPS {
                tokio::time::sleep(interval).await;
                if fails && step == STEPS / 2 {
                    events.failed(DownloadError::transfer("simulated connection reset"));
                    return;
                }
                events.progress(f64::from(step) / f64::from(STEPS));
            }
            tokio::time::sleep(interval).await;
            events.completed(Some(local_file));
        });

        let mut transfers = self.transfers.lock().await;
        transfers.retain(|_, t| !t.handle.is_finished());
        if transfers.get(&task.id).is_some_and(|current| current.lease > lease) {
            tracing::debug!(task_id = %task.id, lease = %lease, "Superseded start dropped");
            handle.abort();
            return Ok(());
        }
        if let Some(previous) = transfers.insert(task.id, Transfer { lease, handle }) {
            previous.handle.abort();
        }
        Ok(())
    }

    async fn cancel(&self, task_id: &TaskId, lease: LeaseId) {
        let mut transfers = self.transfers.lock().await;
        match transfers.get(task_id) {
            Some(current) if current.lease == lease => {
                if let Some(transfer) = transfers.remove(task_id) {
                    transfer.handle.abort();
                }
                tracing::debug!(task_id = %task_id, lease = %lease, "Simulated transfer aborted");
            }
            Some(current) => {
                tracing::debug!(
                    task_id = %task_id,
                    lease = %lease,
                    current = %current.lease,
                    "Ignoring signal for superseded transfer"
                );
            }
            None => {}
        }
    }

    async fn delete_artifact(&self, task: &DownloadTask) -> Result<(), DownloadError> {
        tracing::info!(
            episode_id = %task.episode_id,
            path = %Self::artifact_path(task),
            "Simulated artifact deleted"
        );
        Ok(())
    }
}
