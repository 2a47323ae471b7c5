//! Download domain types, events, errors, and traits.
//!
//! This module contains pure data types for the download system. No I/O,
//! networking, or runtime dependencies allowed.
//!
//! # Structure
//!
//! - `types` - Identifiers, tasks, records and the state machine (`TaskId`, `DownloadTask`, `DownloadState`)
//! - `events` - Progress updates, outbound events and downloader transfer events
//! - `errors` - Error types for download operations

pub mod errors;
pub mod events;
pub mod types;

// Re-export commonly used types
pub use errors::{DownloadError, DownloadErrorKind, DownloadResult};
pub use events::{
    DownloadEvent, DownloadSummary, ProgressStatus, ProgressUpdate, TransferEvent,
    TransferEventKind,
};
pub use types::{
    DownloadRecord, DownloadState, DownloadTask, EstimatedSize, LeaseId, Priority,
    SizeConfidence, TaskId, clamp_fraction,
};
