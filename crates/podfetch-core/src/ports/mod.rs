//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the download core expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No transport, filesystem or HTTP types in any signature
//! - Every port can be replaced by a test double at construction time
//! - Event emission never blocks

pub mod download_event_emitter;
pub mod downloader;
pub mod storage_evaluator;

pub use download_event_emitter::{DownloadEventEmitterPort, NoopDownloadEmitter};
pub use downloader::{DownloaderPort, TransferEventSink};
pub use storage_evaluator::StorageEvaluatorPort;
