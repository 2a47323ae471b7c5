//! Download event broadcasting.
//!
//! Fans coordinator events out to any number of listeners (UI bindings, the
//! CLI progress printer) over a `tokio::sync::broadcast` channel.

use podfetch_core::download::DownloadEvent;
use podfetch_core::ports::DownloadEventEmitterPort;
use podfetch_core::settings::EVENT_CHANNEL_CAPACITY;
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcaster for download events.
///
/// Slow subscribers that fall more than the channel capacity behind observe
/// `RecvError::Lagged` and skip ahead; the coordinator never blocks on them.
#[derive(Debug, Clone)]
pub struct BroadcastEmitter {
    sender: broadcast::Sender<DownloadEvent>,
}

impl BroadcastEmitter {
    /// Create a broadcaster buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to download events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.sender.subscribe()
    }

    /// Get number of active subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEmitter {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl DownloadEventEmitterPort for BroadcastEmitter {
    fn emit(&self, event: DownloadEvent) {
        // No receivers is not an error; nobody is listening yet
        if self.sender.receiver_count() > 0 {
            trace!(?event, "Broadcasting download event");
            let _ = self.sender.send(event);
        }
    }

    fn clone_box(&self) -> Box<dyn DownloadEventEmitterPort> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podfetch_core::download::{ProgressStatus, ProgressUpdate};

    fn update(episode: &str) -> DownloadEvent {
        DownloadEvent::progress(ProgressUpdate::new(
            episode,
            0.5,
            ProgressStatus::Downloading,
        ))
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let emitter = BroadcastEmitter::default();
        let mut first = emitter.subscribe();
        let mut second = emitter.subscribe();
        assert_eq!(emitter.subscriber_count(), 2);

        emitter.emit(update("ep-1"));

        for rx in [&mut first, &mut second] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.as_progress().unwrap().episode_id, "ep-1");
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let emitter = BroadcastEmitter::new(4);
        // Should not panic
        emitter.emit(update("ep-1"));
    }

    #[tokio::test]
    async fn test_clone_box_shares_channel() {
        let emitter = BroadcastEmitter::new(4);
        let mut rx = emitter.subscribe();

        let boxed = emitter.clone_box();
        boxed.emit(update("ep-2"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.as_progress().unwrap().episode_id, "ep-2");
    }
}
