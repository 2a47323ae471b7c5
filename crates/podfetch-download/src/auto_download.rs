//! Automatic enqueueing of newly detected episodes.
//!
//! Whether a new episode downloads on its own is decided per podcast: an
//! explicit override wins, otherwise the podcast's subscription status does.
//! Querying a podcast without an override reports `false`, which is not the
//! value detection falls back to.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use podfetch_core::domain::{Episode, Podcast};
use podfetch_core::download::{Priority, TaskId};
use podfetch_core::settings::DEFAULT_AUTO_DOWNLOAD_PRIORITY;

use crate::coordinator::DownloadCoordinator;

/// Decides whether new episodes are queued automatically.
pub struct AutoDownloadTrigger {
    coordinator: Arc<DownloadCoordinator>,
    priority: Priority,
    overrides: RwLock<HashMap<String, bool>>,
}

impl AutoDownloadTrigger {
    /// Create a trigger that queues at the default auto-download priority.
    #[must_use]
    pub fn new(coordinator: Arc<DownloadCoordinator>) -> Self {
        Self::with_priority(coordinator, DEFAULT_AUTO_DOWNLOAD_PRIORITY)
    }

    #[must_use]
    pub fn with_priority(coordinator: Arc<DownloadCoordinator>, priority: Priority) -> Self {
        Self {
            coordinator,
            priority,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Queue `episode` if auto-download applies to `podcast`.
    ///
    /// Returns the new task id, or `None` when auto-download is off or the
    /// episode already has a live download.
    pub async fn on_new_episode_detected(
        &self,
        episode: &Episode,
        podcast: &Podcast,
    ) -> Option<TaskId> {
        let enabled = self
            .overrides
            .read()
            .await
            .get(&podcast.id)
            .copied()
            .unwrap_or(podcast.is_subscribed);

        if !enabled {
            tracing::debug!(
                episode_id = %episode.id,
                podcast_id = %podcast.id,
                "Auto-download off, episode not queued"
            );
            return None;
        }

        match self.coordinator.add_download(episode, self.priority).await {
            Ok(id) => {
                tracing::info!(
                    task_id = %id,
                    episode_id = %episode.id,
                    podcast_id = %podcast.id,
                    "Episode auto-queued"
                );
                Some(id)
            }
            Err(e) => {
                tracing::warn!(episode_id = %episode.id, error = %e, "Auto-download enqueue failed");
                None
            }
        }
    }

    /// Set the explicit override for a podcast.
    pub async fn set_auto_download(&self, enabled: bool, podcast_id: &str) {
        self.overrides
            .write()
            .await
            .insert(podcast_id.to_string(), enabled);
        tracing::debug!(podcast_id, enabled, "Auto-download override set");
    }

    /// Alias of [`Self::set_auto_download`].
    pub async fn configure_auto_download(&self, enabled: bool, podcast_id: &str) {
        self.set_auto_download(enabled, podcast_id).await;
    }

    /// The explicit override, or `false` when none is set.
    pub async fn get_auto_download_setting(&self, podcast_id: &str) -> bool {
        self.overrides
            .read()
            .await
            .get(podcast_id)
            .copied()
            .unwrap_or(false)
    }
}
