//! Progress throttling.
//!
//! Rate-limits progress events per task so a chatty downloader cannot flood
//! listeners. Queue state is always updated; only publication is throttled.

use std::collections::HashMap;
use std::time::Duration;

use podfetch_core::download::TaskId;
use tokio::time::Instant;

/// Per-task rate limiter for progress events.
///
/// Uses the tokio clock, so paused-time tests advance it deterministically.
#[derive(Debug)]
pub struct ProgressThrottle {
    last_emit: HashMap<TaskId, Instant>,
    min_interval: Duration,
}

impl ProgressThrottle {
    /// Create a throttle with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: HashMap::new(),
            min_interval,
        }
    }

    /// Check if enough time has passed to publish progress for `id`.
    pub fn should_emit(&mut self, id: &TaskId) -> bool {
        let now = Instant::now();
        match self.last_emit.get(id) {
            Some(last) if now.duration_since(*last) < self.min_interval => false,
            _ => {
                self.last_emit.insert(id.clone(), now);
                true
            }
        }
    }

    /// Forget `id`, so its next progress event is published immediately.
    pub fn reset(&mut self, id: &TaskId) {
        self.last_emit.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_throttle_first_emit() {
        let mut throttle = ProgressThrottle::new(Duration::from_millis(100));
        assert!(throttle.should_emit(&TaskId::new("a"))); // First call always emits
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_respects_interval() {
        let mut throttle = ProgressThrottle::new(Duration::from_millis(50));
        let id = TaskId::new("a");
        assert!(throttle.should_emit(&id));
        assert!(!throttle.should_emit(&id)); // Too soon

        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(throttle.should_emit(&id)); // Enough time passed
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_is_per_task() {
        let mut throttle = ProgressThrottle::new(Duration::from_millis(100));
        assert!(throttle.should_emit(&TaskId::new("a")));
        assert!(throttle.should_emit(&TaskId::new("b")));
        assert!(!throttle.should_emit(&TaskId::new("a")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_reset() {
        let mut throttle = ProgressThrottle::new(Duration::from_millis(100));
        let id = TaskId::new("a");
        throttle.should_emit(&id);
        assert!(!throttle.should_emit(&id));

        throttle.reset(&id);
        assert!(throttle.should_emit(&id)); // Reset allows immediate emit
    }
}
