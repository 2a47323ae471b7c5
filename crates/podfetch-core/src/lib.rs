//! Core domain types and port definitions for podfetch.
//!
//! This crate holds everything the download orchestrator shares with its
//! adapters: tasks, records and their state machine, library inputs
//! (episodes, podcasts), retention policies, events, errors, the port traits
//! for external collaborators, and [`DownloadSettings`].

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod download;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{Episode, ParsePolicyError, Podcast, RetentionPolicy, StorageAction};
pub use download::{
    DownloadError, DownloadErrorKind, DownloadEvent, DownloadRecord, DownloadResult,
    DownloadState, DownloadSummary, DownloadTask, EstimatedSize, LeaseId, Priority,
    ProgressStatus, ProgressUpdate, SizeConfidence, TaskId, TransferEvent, TransferEventKind,
};
pub use ports::{
    DownloadEventEmitterPort, DownloaderPort, NoopDownloadEmitter, StorageEvaluatorPort,
    TransferEventSink,
};
pub use settings::{
    DEFAULT_AUTO_DOWNLOAD_PRIORITY, DEFAULT_MAX_CONCURRENT_DOWNLOADS,
    DEFAULT_PROGRESS_INTERVAL_MS, DownloadSettings, EVENT_CHANNEL_CAPACITY,
    FALLBACK_ESTIMATED_SIZE_BYTES, MAX_RETRY_COUNT, RETRY_DELAYS_SECS, SettingsError,
    SettingsUpdate, validate_settings,
};
