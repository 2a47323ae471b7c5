//! Download event emitter port.
//!
//! This port abstracts download event emission, allowing the coordinator
//! to publish events without coupling to transport details (channels, UI bindings).

use crate::download::DownloadEvent;

/// Port for emitting download events.
///
/// Implementations handle the actual event delivery (broadcast channels,
/// UI bridges, test recorders).
///
/// # Example
///
/// ```ignore
/// fn on_progress(&self, emitter: &dyn DownloadEventEmitterPort) {
///     emitter.emit(DownloadEvent::progress(update));
/// }
/// ```
pub trait DownloadEventEmitterPort: Send + Sync {
    /// Emit a download event.
    ///
    /// Called while the coordinator holds its queue lock, so this method
    /// must not block.
    fn emit(&self, event: DownloadEvent);

    /// Clone this emitter into a boxed trait object.
    fn clone_box(&self) -> Box<dyn DownloadEventEmitterPort>;
}

/// A no-op download event emitter for tests and headless contexts.
#[derive(Debug, Clone, Default)]
pub struct NoopDownloadEmitter;

impl NoopDownloadEmitter {
    /// Create a new no-op download emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DownloadEventEmitterPort for NoopDownloadEmitter {
    fn emit(&self, _event: DownloadEvent) {
        // Intentionally do nothing
    }

    fn clone_box(&self) -> Box<dyn DownloadEventEmitterPort> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{ProgressStatus, ProgressUpdate};
    use std::sync::Arc;

    #[test]
    fn test_noop_emitter() {
        let emitter = NoopDownloadEmitter::new();

        // Should not panic
        emitter.emit(DownloadEvent::progress(ProgressUpdate::new(
            "ep",
            0.1,
            ProgressStatus::Downloading,
        )));
    }

    #[test]
    fn test_arc_emitter_clone_box() {
        let emitter: Arc<dyn DownloadEventEmitterPort> = Arc::new(NoopDownloadEmitter::new());
        let _boxed: Box<dyn DownloadEventEmitterPort> = emitter.clone_box();
    }
}
