//! Common test utilities.
//!
//! Shared fakes for driving a `DownloadCoordinator` without real transfers:
//! a downloader that hands every started transfer back to the test, and an
//! emitter that records everything published.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::{mpsc, watch};

use podfetch_core::domain::Episode;
use podfetch_core::download::{
    DownloadError, DownloadEvent, DownloadState, DownloadSummary, DownloadTask, LeaseId,
    ProgressUpdate, TaskId,
};
use podfetch_core::ports::{DownloadEventEmitterPort, DownloaderPort, TransferEventSink};
use podfetch_download::{
    CoordinatorConfig, CoordinatorDeps, DownloadCoordinator, StorageEvictionEvaluator,
};

/// Longest a test waits for the coordinator before giving up.
pub const WAIT_LIMIT: Duration = Duration::from_secs(300);

// ── Fake downloader ────────────────────────────────────────────────

/// Downloader that reports nothing on its own.
///
/// Each `start` is forwarded to the test as `(task, sink)`; the test then
/// plays the transfer by calling the sink.
pub struct FakeDownloader {
    started_tx: mpsc::UnboundedSender<(DownloadTask, TransferEventSink)>,
    refuse_start: HashSet<String>,
    fail_delete: HashSet<String>,
    cancelled: Mutex<Vec<(TaskId, LeaseId)>>,
    paused: Mutex<Vec<(TaskId, LeaseId)>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(DownloadTask, TransferEventSink)>) {
        let (started_tx, started_rx) = mpsc::unbounded_channel();
        let downloader = Self {
            started_tx,
            refuse_start: HashSet::new(),
            fail_delete: HashSet::new(),
            cancelled: Mutex::new(Vec::new()),
            paused: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        };
        (downloader, started_rx)
    }

    /// `start` fails outright for this episode.
    pub fn refuse_start(mut self, episode_id: &str) -> Self {
        self.refuse_start.insert(episode_id.to_string());
        self
    }

    /// `delete_artifact` fails for this episode.
    pub fn fail_delete(mut self, episode_id: &str) -> Self {
        self.fail_delete.insert(episode_id.to_string());
        self
    }

    pub fn cancelled(&self) -> Vec<TaskId> {
        self.cancelled.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn paused(&self) -> Vec<TaskId> {
        self.paused.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    /// Pause signals with the lease each one targeted.
    pub fn pause_signals(&self) -> Vec<(TaskId, LeaseId)> {
        self.paused.lock().unwrap().clone()
    }

    /// Cancel signals with the lease each one targeted.
    pub fn cancel_signals(&self) -> Vec<(TaskId, LeaseId)> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloaderPort for FakeDownloader {
    async fn start(&self, task: DownloadTask, events: TransferEventSink) -> Result<(), DownloadError> {
        if self.refuse_start.contains(&task.episode_id) {
            return Err(DownloadError::transfer("connection refused"));
        }
        let _ = self.started_tx.send((task, events));
        Ok(())
    }

    async fn cancel(&self, task_id: &TaskId, lease: LeaseId) {
        self.cancelled.lock().unwrap().push((task_id.clone(), lease));
    }

    async fn pause(&self, task_id: &TaskId, lease: LeaseId) {
        self.paused.lock().unwrap().push((task_id.clone(), lease));
    }

    async fn delete_artifact(&self, task: &DownloadTask) -> Result<(), DownloadError> {
        if self.fail_delete.contains(&task.episode_id) {
            return Err(DownloadError::storage("permission denied"));
        }
        self.deleted.lock().unwrap().push(task.episode_id.clone());
        Ok(())
    }
}

// ── Recording emitter ──────────────────────────────────────────────

/// Emitter that keeps every event for later inspection.
#[derive(Clone, Default)]
pub struct RecordingEmitter {
    events: Arc<Mutex<Vec<DownloadEvent>>>,
}

impl RecordingEmitter {
    pub fn events(&self) -> Vec<DownloadEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Progress updates published so far.
    pub fn progress(&self) -> Vec<ProgressUpdate> {
        self.events()
            .iter()
            .filter_map(DownloadEvent::as_progress)
            .cloned()
            .collect()
    }

    /// Progress updates for one episode.
    pub fn progress_for(&self, episode_id: &str) -> Vec<ProgressUpdate> {
        self.progress()
            .into_iter()
            .filter(|u| u.episode_id == episode_id)
            .collect()
    }
}

impl DownloadEventEmitterPort for RecordingEmitter {
    fn emit(&self, event: DownloadEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn clone_box(&self) -> Box<dyn DownloadEventEmitterPort> {
        Box::new(self.clone())
    }
}

// ── Harness ────────────────────────────────────────────────────────

/// A coordinator wired to the fakes above.
pub struct Harness {
    pub coordinator: Arc<DownloadCoordinator>,
    pub downloader: Arc<FakeDownloader>,
    pub emitter: RecordingEmitter,
    pub started: mpsc::UnboundedReceiver<(DownloadTask, TransferEventSink)>,
    pub queue: watch::Receiver<Vec<DownloadSummary>>,
}

impl Harness {
    pub fn new() -> Self {
        let (downloader, started) = FakeDownloader::new();
        Self::with(downloader, started, CoordinatorConfig::default())
    }

    pub fn with(
        downloader: FakeDownloader,
        started: mpsc::UnboundedReceiver<(DownloadTask, TransferEventSink)>,
        config: CoordinatorConfig,
    ) -> Self {
        let downloader = Arc::new(downloader);
        let emitter = RecordingEmitter::default();
        let coordinator = DownloadCoordinator::new(CoordinatorDeps {
            downloader: downloader.clone(),
            evaluator: Arc::new(StorageEvictionEvaluator::new()),
            event_emitter: Arc::new(emitter.clone()),
            config,
        });
        let queue = coordinator.watch_queue();

        Self {
            coordinator,
            downloader,
            emitter,
            started,
            queue,
        }
    }

    /// Next transfer handed to the downloader.
    pub async fn next_start(&mut self) -> (DownloadTask, TransferEventSink) {
        tokio::time::timeout(WAIT_LIMIT, self.started.recv())
            .await
            .expect("timed out waiting for a transfer to start")
            .expect("downloader dropped")
    }

    /// Wait until the episode's visible record is in `state`.
    pub async fn wait_for_state(&mut self, episode_id: &str, state: DownloadState) -> DownloadSummary {
        wait_for(&mut self.queue, |s| s.episode_id == episode_id && s.state == state).await
    }
}

/// Wait until some visible record matches `predicate`.
pub async fn wait_for(
    rx: &mut watch::Receiver<Vec<DownloadSummary>>,
    predicate: impl Fn(&DownloadSummary) -> bool,
) -> DownloadSummary {
    let fut = async {
        let items = rx
            .wait_for(|items| items.iter().any(&predicate))
            .await
            .expect("coordinator dropped");
        items
            .iter()
            .find(|s| predicate(*s))
            .cloned()
            .expect("matching record")
    };
    tokio::time::timeout(WAIT_LIMIT, fut)
        .await
        .expect("timed out waiting for queue state")
}

// ── Fixtures ───────────────────────────────────────────────────────

pub fn base_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

/// Episode of podcast "pod", published `days_ago` days before [`base_date`].
pub fn episode(id: &str, days_ago: i64) -> Episode {
    Episode::new(
        id,
        "pod",
        format!("Episode {id}"),
        format!("https://cdn.example.com/{id}.mp3"),
        base_date() - chrono::Duration::days(days_ago),
    )
    .with_enclosure_length(Some(12_000_000))
}
