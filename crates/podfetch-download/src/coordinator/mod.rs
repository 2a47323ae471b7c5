//! Download coordinator.
//!
//! The coordinator drives the queue forward: it decides what downloads next,
//! hands tasks to the downloader, applies the downloader's events, schedules
//! retries, and republishes state changes to listeners.
//!
//! # Architecture
//!
//! - **State**: `TaskQueue` plus the active lease table, behind one `Mutex`
//! - **Pump**: a single long-lived task applying transfer events and retry
//!   wake-ups in arrival order; it only holds a `Weak` reference
//! - **Transfers**: spawned tasks calling `DownloaderPort::start`, outside the lock
//!
//! # Concurrency Model
//!
//! - Every mutation and scheduling decision happens while holding the state lock
//! - Lease tokens let the pump drop events from superseded transfers
//! - Event emission never blocks, so it is done under the lock
//! - Downloader `cancel`/`pause` signals are spawned and never awaited by user actions

mod storage;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;

use podfetch_core::domain::Episode;
use podfetch_core::download::{
    DownloadError, DownloadEvent, DownloadRecord, DownloadState, DownloadSummary, DownloadTask,
    LeaseId, Priority, ProgressUpdate, TaskId, TransferEvent, TransferEventKind,
};
use podfetch_core::ports::{
    DownloadEventEmitterPort, DownloaderPort, StorageEvaluatorPort, TransferEventSink,
};
use podfetch_core::settings::{
    DEFAULT_MAX_CONCURRENT_DOWNLOADS, DEFAULT_PROGRESS_INTERVAL_MS, DownloadSettings,
    FALLBACK_ESTIMATED_SIZE_BYTES,
};

use crate::progress::ProgressThrottle;
use crate::queue::TaskQueue;
use crate::retry::{RetryPolicy, RetryScheduler};

pub use storage::{FailedStorageAction, StoragePolicyReport};

/// Tunables for the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Transfers the scheduler keeps running at once.
    pub max_concurrent_downloads: usize,
    /// Retry budget and backoff table.
    pub retry_policy: RetryPolicy,
    /// Minimum interval between progress events per task.
    pub progress_interval: Duration,
    /// Size estimate for episodes without an enclosure length.
    pub fallback_estimated_size_bytes: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS as usize,
            retry_policy: RetryPolicy::default(),
            progress_interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
            fallback_estimated_size_bytes: FALLBACK_ESTIMATED_SIZE_BYTES,
        }
    }
}

impl CoordinatorConfig {
    #[must_use]
    pub fn from_settings(settings: &DownloadSettings) -> Self {
        Self {
            max_concurrent_downloads: settings.effective_max_concurrent_downloads(),
            retry_policy: RetryPolicy::from_settings(settings),
            progress_interval: settings.effective_progress_interval(),
            fallback_estimated_size_bytes: settings.effective_fallback_size_bytes(),
        }
    }
}

/// Dependencies for creating a coordinator.
///
/// Bundles the ports and configuration needed to construct a
/// [`DownloadCoordinator`]. Every port can be a test double.
pub struct CoordinatorDeps {
    /// Performs transfers and deletes artifacts.
    pub downloader: Arc<dyn DownloaderPort>,
    /// Maps retention policies to storage actions.
    pub evaluator: Arc<dyn StorageEvaluatorPort>,
    /// Receives progress, snapshot and storage events.
    pub event_emitter: Arc<dyn DownloadEventEmitterPort>,
    /// Configuration for the coordinator.
    pub config: CoordinatorConfig,
}

/// Everything guarded by the coordinator lock.
struct CoordinatorState {
    queue: TaskQueue,
    /// Lease of the transfer currently allowed to report for each task.
    leases: HashMap<TaskId, LeaseId>,
    throttle: ProgressThrottle,
}

/// Orchestrates the download queue.
pub struct DownloadCoordinator {
    downloader: Arc<dyn DownloaderPort>,
    evaluator: Arc<dyn StorageEvaluatorPort>,
    event_emitter: Arc<dyn DownloadEventEmitterPort>,
    config: CoordinatorConfig,
    state: Mutex<CoordinatorState>,
    /// Counter for generating lease IDs.
    lease_counter: AtomicU64,
    transfer_tx: mpsc::UnboundedSender<TransferEvent>,
    retry: RetryScheduler,
    snapshot_tx: watch::Sender<Vec<DownloadSummary>>,
    shutdown: CancellationToken,
}

impl DownloadCoordinator {
    /// Create a coordinator and start its event pump.
    ///
    /// Must be called from within a Tokio runtime. A concurrency limit of
    /// zero is raised to one.
    #[must_use]
    pub fn new(deps: CoordinatorDeps) -> Arc<Self> {
        let mut config = deps.config;
        config.max_concurrent_downloads = config.max_concurrent_downloads.max(1);

        let (transfer_tx, transfer_rx) = mpsc::unbounded_channel();
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(Vec::new());
        let shutdown = CancellationToken::new();

        let retry = RetryScheduler::new(
            config.retry_policy.clone(),
            retry_tx,
            shutdown.child_token(),
        );
        let throttle = ProgressThrottle::new(config.progress_interval);

        let coordinator = Arc::new(Self {
            downloader: deps.downloader,
            evaluator: deps.evaluator,
            event_emitter: deps.event_emitter,
            config,
            state: Mutex::new(CoordinatorState {
                queue: TaskQueue::new(),
                leases: HashMap::new(),
                throttle,
            }),
            lease_counter: AtomicU64::new(0),
            transfer_tx,
            retry,
            snapshot_tx,
            shutdown: shutdown.clone(),
        });

        tokio::spawn(run_pump(
            Arc::downgrade(&coordinator),
            transfer_rx,
            retry_rx,
            shutdown,
        ));

        coordinator
    }

    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // =========================================================================
    // Public API
    // =========================================================================

    /// Queue a download for `episode`.
    ///
    /// Rejected with `AlreadyQueued` while the episode has a live record; a
    /// completed or cancelled record for the episode is replaced.
    pub async fn add_download(
        &self,
        episode: &Episode,
        priority: Priority,
    ) -> Result<TaskId, DownloadError> {
        let task = DownloadTask::from_episode(
            episode,
            priority,
            self.config.fallback_estimated_size_bytes,
        );

        let mut state = self.state.lock().await;
        if state
            .queue
            .find_by_episode(&episode.id)
            .is_some_and(|r| !r.state.is_terminal())
        {
            return Err(DownloadError::already_queued(episode.id.clone()));
        }

        for id in state.queue.ids_for_episode(&episode.id) {
            state.queue.remove_from_queue(&id);
            state.throttle.reset(&id);
        }

        self.insert_task(&mut state, task)
    }

    /// Queue a prepared task as-is.
    pub async fn enqueue(&self, task: DownloadTask) -> Result<TaskId, DownloadError> {
        let mut state = self.state.lock().await;
        self.insert_task(&mut state, task)
    }

    /// Pause the episode's running download.
    pub async fn pause_download(&self, episode_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(id) = resolve(&state.queue, episode_id) else {
            return false;
        };
        if !state.queue.pause_download(&id) {
            return false;
        }

        if let Some(lease) = state.leases.remove(&id) {
            let downloader = Arc::clone(&self.downloader);
            let paused = id.clone();
            tokio::spawn(async move { downloader.pause(&paused, lease).await });
        }
        tracing::info!(task_id = %id, episode_id, "Download paused");

        self.emit_record(&state, &id);
        self.fill_slots(&mut state);
        self.publish_snapshot(&state);
        true
    }

    /// Resume the episode's paused download under a fresh transfer.
    pub async fn resume_download(&self, episode_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(id) = resolve(&state.queue, episode_id) else {
            return false;
        };
        if !state.queue.resume_download(&id) {
            return false;
        }

        if let Some(task) = state.queue.get_task(&id).map(|r| r.task.clone()) {
            self.start_transfer(&mut state, task);
        }
        tracing::info!(task_id = %id, episode_id, "Download resumed");

        self.emit_record(&state, &id);
        self.publish_snapshot(&state);
        true
    }

    /// Cancel the episode's download. Idempotent.
    pub async fn cancel_download(&self, episode_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(id) = resolve(&state.queue, episode_id) else {
            return false;
        };
        if state
            .queue
            .get_task(&id)
            .is_some_and(|r| r.state == DownloadState::Cancelled)
        {
            return true;
        }
        if !state.queue.cancel_download(&id) {
            return false;
        }

        if let Some(lease) = state.leases.remove(&id) {
            self.signal_cancel(id.clone(), lease);
        }
        state.throttle.reset(&id);
        tracing::info!(task_id = %id, episode_id, "Download cancelled");

        self.emit_record(&state, &id);
        self.fill_slots(&mut state);
        self.publish_snapshot(&state);
        true
    }

    /// Manually retry the episode's failed download.
    ///
    /// Works even after the automatic retry budget is spent.
    pub async fn request_download(&self, episode_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(id) = resolve(&state.queue, episode_id) else {
            return false;
        };
        if !state.queue.retry_failed_download(&id) {
            return false;
        }
        tracing::info!(task_id = %id, episode_id, "Manual retry requested");

        self.emit_record(&state, &id);
        self.fill_slots(&mut state);
        self.publish_snapshot(&state);
        true
    }

    /// Remove the episode's record regardless of state.
    ///
    /// A running transfer receives a best-effort cancel.
    pub async fn remove_download(&self, episode_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(id) = resolve(&state.queue, episode_id) else {
            return false;
        };
        if state.queue.remove_from_queue(&id).is_none() {
            return false;
        }

        if let Some(lease) = state.leases.remove(&id) {
            self.signal_cancel(id.clone(), lease);
        }
        state.throttle.reset(&id);
        tracing::info!(task_id = %id, episode_id, "Download removed");

        self.fill_slots(&mut state);
        self.publish_snapshot(&state);
        true
    }

    /// Replace the visible order with the given episodes.
    ///
    /// Episodes left out stay tracked but are hidden and never auto-started.
    pub async fn reorder_queue(&self, episode_ids: &[String]) {
        let mut state = self.state.lock().await;
        let ids: Vec<TaskId> = episode_ids
            .iter()
            .filter_map(|episode_id| resolve(&state.queue, episode_id))
            .collect();

        state.queue.reorder_queue(&ids);
        tracing::debug!(visible = ids.len(), "Queue reordered");

        self.fill_slots(&mut state);
        self.publish_snapshot(&state);
    }

    /// Tasks in visible order.
    pub async fn get_download_queue(&self) -> Vec<DownloadTask> {
        self.state.lock().await.queue.get_current_queue()
    }

    /// Current record for an episode.
    pub async fn get_record(&self, episode_id: &str) -> Option<DownloadRecord> {
        self.state
            .lock()
            .await
            .queue
            .find_by_episode(episode_id)
            .cloned()
    }

    /// Summaries of the visible queue.
    pub async fn queue_snapshot(&self) -> Vec<DownloadSummary> {
        self.state.lock().await.queue.snapshot()
    }

    /// Current queue snapshot plus every future one.
    #[must_use]
    pub fn watch_queue(&self) -> watch::Receiver<Vec<DownloadSummary>> {
        self.snapshot_tx.subscribe()
    }

    /// Stop the pump and pending retry timers, and cancel running transfers.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let active: Vec<(TaskId, LeaseId)> = {
            let mut state = self.state.lock().await;
            state.leases.drain().collect()
        };

        tracing::info!(active = active.len(), "Download coordinator shutting down");
        for (id, lease) in active {
            self.downloader.cancel(&id, lease).await;
        }
    }

    // =========================================================================
    // Pump handlers
    // =========================================================================

    async fn handle_transfer_event(&self, event: TransferEvent) {
        let mut state = self.state.lock().await;

        if state.leases.get(&event.task_id) != Some(&event.lease) {
            tracing::debug!(
                task_id = %event.task_id,
                lease = %event.lease,
                "Ignoring stale transfer event (lease mismatch)"
            );
            return;
        }

        let id = event.task_id;
        match event.kind {
            TransferEventKind::Progress { fraction } if fraction >= 1.0 => {
                self.on_completed(&mut state, &id, None);
            }
            TransferEventKind::Progress { fraction } => {
                self.on_progress(&mut state, &id, fraction);
            }
            TransferEventKind::Completed { local_file } => {
                self.on_completed(&mut state, &id, local_file);
            }
            TransferEventKind::Failed { error } => {
                self.on_failed(&mut state, &id, error);
            }
        }
    }

    async fn handle_retry(&self, id: TaskId) {
        let mut state = self.state.lock().await;
        if !state.queue.retry_failed_download(&id) {
            tracing::debug!(task_id = %id, "Retry no longer applies");
            return;
        }
        tracing::info!(task_id = %id, "Retrying download");

        self.emit_record(&state, &id);
        self.fill_slots(&mut state);
        self.publish_snapshot(&state);
    }

    fn on_progress(&self, state: &mut CoordinatorState, id: &TaskId, fraction: f64) {
        if !state.queue.update_progress(id, fraction) {
            return;
        }

        if state.throttle.should_emit(id) {
            self.emit_record(state, id);
        } else {
            tracing::trace!(task_id = %id, fraction, "Progress event throttled");
        }
        self.publish_snapshot(state);
    }

    fn on_completed(&self, state: &mut CoordinatorState, id: &TaskId, local_file: Option<String>) {
        state.leases.remove(id);
        state.throttle.reset(id);

        if let Err(e) = state.queue.mark_completed(id, local_file) {
            tracing::debug!(task_id = %id, error = %e, "Completion ignored");
            return;
        }
        tracing::info!(task_id = %id, "Download completed");

        self.emit_record(state, id);
        self.fill_slots(state);
        self.publish_snapshot(state);
    }

    fn on_failed(&self, state: &mut CoordinatorState, id: &TaskId, error: DownloadError) {
        state.leases.remove(id);
        state.throttle.reset(id);

        let error = error.into_transfer();
        let max_retry_count = self.retry.policy().max_retry_count();
        let retry_count = match state.queue.mark_failed(id, &error, max_retry_count) {
            Ok(record) => record.task.retry_count,
            Err(e) => {
                tracing::debug!(task_id = %id, error = %e, "Failure ignored");
                return;
            }
        };
        tracing::warn!(task_id = %id, retry_count, error = %error, "Download failed");

        self.emit_record(state, id);

        if self.retry.policy().should_retry(retry_count) {
            self.retry
                .schedule_retry(id.clone(), retry_count.saturating_sub(1));
        } else {
            tracing::info!(task_id = %id, retry_count, "Retry budget exhausted");
        }

        self.fill_slots(state);
        self.publish_snapshot(state);
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    fn insert_task(
        &self,
        state: &mut CoordinatorState,
        task: DownloadTask,
    ) -> Result<TaskId, DownloadError> {
        let id = task.id.clone();
        let episode_id = task.episode_id.clone();
        let position = state.queue.add_to_queue(task)?;
        tracing::info!(task_id = %id, episode_id, position, "Download queued");

        self.emit_record(state, &id);
        self.fill_slots(state);
        self.publish_snapshot(state);
        Ok(id)
    }

    /// Start pending tasks, in visible order, until the concurrency limit is reached.
    fn fill_slots(&self, state: &mut CoordinatorState) {
        let free = self
            .config
            .max_concurrent_downloads
            .saturating_sub(state.queue.downloading_count());

        for id in state.queue.next_pending(free) {
            let task = match state.queue.mark_downloading(&id) {
                Ok(record) => record.task.clone(),
                Err(e) => {
                    tracing::debug!(task_id = %id, error = %e, "Could not start download");
                    continue;
                }
            };
            self.start_transfer(state, task);
            self.emit_record(state, &id);
        }
    }

    /// Mint a lease and hand `task` to the downloader.
    fn start_transfer(&self, state: &mut CoordinatorState, task: DownloadTask) {
        let lease = LeaseId(self.lease_counter.fetch_add(1, Ordering::Relaxed));
        let id = task.id.clone();
        state.leases.insert(id.clone(), lease);
        state.throttle.reset(&id);

        tracing::info!(task_id = %id, lease = %lease, title = %task.title, "Download started");

        let sink = TransferEventSink::new(id, lease, self.transfer_tx.clone());
        let downloader = Arc::clone(&self.downloader);
        tokio::spawn(async move {
            if let Err(e) = downloader.start(task, sink.clone()).await {
                sink.failed(e);
            }
        });
    }

    fn signal_cancel(&self, id: TaskId, lease: LeaseId) {
        let downloader = Arc::clone(&self.downloader);
        tokio::spawn(async move { downloader.cancel(&id, lease).await });
    }

    // =========================================================================
    // Publication
    // =========================================================================

    fn emit_record(&self, state: &CoordinatorState, id: &TaskId) {
        if let Some(record) = state.queue.get_task(id) {
            self.event_emitter
                .emit(DownloadEvent::progress(ProgressUpdate::from_record(record)));
        }
    }

    fn publish_snapshot(&self, state: &CoordinatorState) {
        let items = state.queue.snapshot();
        self.snapshot_tx.send_replace(items.clone());
        self.event_emitter.emit(DownloadEvent::QueueSnapshot { items });
    }
}

impl Drop for DownloadCoordinator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Resolve an episode to the task id of its current record.
fn resolve(queue: &TaskQueue, episode_id: &str) -> Option<TaskId> {
    queue.find_by_episode(episode_id).map(|r| r.task.id.clone())
}

/// Apply transfer events and retry wake-ups one at a time.
///
/// Exits on shutdown or once the coordinator is gone.
async fn run_pump(
    coordinator: Weak<DownloadCoordinator>,
    mut transfer_rx: mpsc::UnboundedReceiver<TransferEvent>,
    mut retry_rx: mpsc::UnboundedReceiver<TaskId>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            Some(event) = transfer_rx.recv() => {
                let Some(coordinator) = coordinator.upgrade() else { break };
                coordinator.handle_transfer_event(event).await;
            }
            Some(id) = retry_rx.recv() => {
                let Some(coordinator) = coordinator.upgrade() else { break };
                coordinator.handle_retry(id).await;
            }
            else => break,
        }
    }
    tracing::debug!("Download event pump stopped");
}
