//! Download orchestration for podfetch.
//!
//! - `queue` - `TaskQueue`, the pure state machine behind the queue
//! - `coordinator` - `DownloadCoordinator`, which schedules and drives transfers
//! - `retry` - backoff table and deferred retry timers
//! - `eviction` - retention policy evaluation
//! - `auto_download` - per-podcast automatic enqueueing
//! - `emitter` - broadcast fan-out of download events

// Re-export core types for convenience
pub use podfetch_core::download::{
    DownloadError, DownloadEvent, DownloadRecord, DownloadState, DownloadSummary, DownloadTask,
    Priority, ProgressStatus, ProgressUpdate, TaskId,
};
pub use podfetch_core::ports::{
    DownloadEventEmitterPort, DownloaderPort, StorageEvaluatorPort, TransferEventSink,
};

pub(crate) mod progress;
pub mod queue;

mod auto_download;
mod coordinator;
mod emitter;
mod eviction;
mod retry;

pub use auto_download::AutoDownloadTrigger;
pub use coordinator::{
    CoordinatorConfig, CoordinatorDeps, DownloadCoordinator, FailedStorageAction,
    StoragePolicyReport,
};
pub use emitter::BroadcastEmitter;
pub use eviction::StorageEvictionEvaluator;
pub use progress::ProgressThrottle;
pub use queue::TaskQueue;
pub use retry::{RetryPolicy, RetryScheduler};
