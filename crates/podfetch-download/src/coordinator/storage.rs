//! Retention policy enforcement.
//!
//! Evaluation is delegated to the `StorageEvaluatorPort`; this module carries
//! out the resulting actions against the queue and the downloader.

use serde::Serialize;

use podfetch_core::domain::{Episode, RetentionPolicy, StorageAction};
use podfetch_core::download::{
    DownloadError, DownloadEvent, DownloadState, DownloadTask, Priority,
};

use super::DownloadCoordinator;

/// A storage action that could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedStorageAction {
    pub action: StorageAction,
    pub error: DownloadError,
}

/// Outcome of [`DownloadCoordinator::apply_storage_policies`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoragePolicyReport {
    /// Actions that were carried out.
    pub applied: Vec<StorageAction>,
    /// Actions that failed and were skipped.
    pub failed: Vec<FailedStorageAction>,
}

impl StoragePolicyReport {
    /// Whether every action succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Episodes whose artifacts were deleted.
    pub fn deleted_episodes(&self) -> impl Iterator<Item = &str> {
        self.applied.iter().filter_map(|action| match action {
            StorageAction::DeleteEpisode(id) => Some(id.as_str()),
            StorageAction::ArchiveEpisode(_) => None,
        })
    }
}

impl DownloadCoordinator {
    /// Enforce `policy` on one podcast's episodes.
    ///
    /// Episodes of other podcasts are ignored. Each `DeleteEpisode` removes
    /// the episode's queue entries (cancelling a running transfer) and then
    /// deletes the artifact; `ArchiveEpisode` only records the request.
    /// A failing action is logged and skipped; the batch continues.
    pub async fn apply_storage_policies(
        &self,
        podcast_id: &str,
        episodes: &[Episode],
        policy: RetentionPolicy,
    ) -> StoragePolicyReport {
        let scoped: Vec<Episode> = episodes
            .iter()
            .filter(|ep| ep.podcast_id == podcast_id)
            .cloned()
            .collect();
        if scoped.len() < episodes.len() {
            tracing::debug!(
                podcast_id,
                skipped = episodes.len() - scoped.len(),
                "Ignoring episodes of other podcasts"
            );
        }

        let actions = self.evaluator.evaluate(policy, &scoped);
        tracing::info!(
            podcast_id,
            policy = %policy,
            actions = actions.len(),
            "Applying storage policy"
        );

        let mut report = StoragePolicyReport::default();
        for action in actions {
            let result = match &action {
                StorageAction::DeleteEpisode(episode_id) => {
                    self.delete_episode(episode_id, &scoped).await
                }
                StorageAction::ArchiveEpisode(episode_id) => {
                    tracing::info!(episode_id = %episode_id, "Archive requested");
                    Ok(())
                }
            };

            match result {
                Ok(()) => {
                    self.event_emitter.emit(DownloadEvent::StorageActionApplied {
                        action: action.clone(),
                    });
                    report.applied.push(action);
                }
                Err(error) => {
                    tracing::warn!(
                        episode_id = %action.episode_id(),
                        error = %error,
                        "Storage action failed, skipping"
                    );
                    self.event_emitter.emit(DownloadEvent::StorageActionFailed {
                        action: action.clone(),
                        error: error.to_string(),
                    });
                    report.failed.push(FailedStorageAction { action, error });
                }
            }
        }

        report
    }

    /// Drop every queue entry of the episode, then delete its artifact.
    async fn delete_episode(
        &self,
        episode_id: &str,
        episodes: &[Episode],
    ) -> Result<(), DownloadError> {
        let (removed, cancelled) = {
            let mut state = self.state.lock().await;
            let mut removed = Vec::new();
            let mut cancelled = Vec::new();
            for id in state.queue.ids_for_episode(episode_id) {
                if let Some(record) = state.queue.remove_from_queue(&id) {
                    if let Some(lease) = state.leases.remove(&id) {
                        cancelled.push((id.clone(), lease));
                    }
                    state.throttle.reset(&id);
                    removed.push(record);
                }
            }
            if !removed.is_empty() {
                self.fill_slots(&mut state);
                self.publish_snapshot(&state);
            }
            (removed, cancelled)
        };

        for (id, lease) in &cancelled {
            self.downloader.cancel(id, *lease).await;
        }

        // Prefer the record that produced the file; fall back to episode metadata
        let task = removed
            .iter()
            .find(|r| r.state == DownloadState::Completed)
            .or_else(|| removed.first())
            .map(|r| r.task.clone())
            .or_else(|| {
                episodes.iter().find(|ep| ep.id == episode_id).map(|ep| {
                    DownloadTask::from_episode(
                        ep,
                        Priority::default(),
                        self.config.fallback_estimated_size_bytes,
                    )
                })
            })
            .ok_or_else(|| {
                DownloadError::storage(format!("no download or episode found for {episode_id}"))
            })?;

        self.downloader
            .delete_artifact(&task)
            .await
            .map_err(|e| match e {
                storage @ DownloadError::Storage { .. } => storage,
                other => DownloadError::storage(other.to_string()),
            })?;

        tracing::info!(
            episode_id,
            removed = removed.len(),
            "Episode deleted by storage policy"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lists_deleted_episodes_only() {
        let report = StoragePolicyReport {
            applied: vec![
                StorageAction::DeleteEpisode("a".into()),
                StorageAction::ArchiveEpisode("b".into()),
            ],
            failed: Vec::new(),
        };
        assert!(report.is_clean());
        assert_eq!(report.deleted_episodes().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_report_json_shape() {
        let report = StoragePolicyReport {
            applied: Vec::new(),
            failed: vec![FailedStorageAction {
                action: StorageAction::DeleteEpisode("a".into()),
                error: DownloadError::storage("disk full"),
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["applied"], serde_json::json!([]));
        assert_eq!(json["failed"][0]["action"]["episode_id"], "a");
        assert!(json["failed"][0]["error"].to_string().contains("disk full"));
    }
}
