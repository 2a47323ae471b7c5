//! Retention policy evaluation.
//!
//! Pure mapping from a retention policy and a podcast's episodes to the
//! storage actions that enforce it. Episodes carrying user state (playback in
//! progress, favourite, bookmark, archive flag, rating, manual download) are
//! never selected for deletion.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use podfetch_core::domain::{Episode, RetentionPolicy, StorageAction};
use podfetch_core::ports::StorageEvaluatorPort;

/// Default [`StorageEvaluatorPort`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageEvictionEvaluator;

impl StorageEvictionEvaluator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decide the actions `policy` requires for `episodes` as of `now`.
    ///
    /// Output order follows the policy's own ordering: publish date
    /// (newest first) for `KeepLatest`, input order otherwise.
    #[must_use]
    pub fn evaluate(
        &self,
        policy: RetentionPolicy,
        episodes: &[Episode],
        now: DateTime<Utc>,
    ) -> Vec<StorageAction> {
        match policy {
            RetentionPolicy::KeepAll => Vec::new(),
            RetentionPolicy::KeepLatest(keep) => keep_latest(episodes, keep as usize),
            RetentionPolicy::DeleteAfterDays(days) => {
                // An unrepresentable cutoff predates every episode
                let Some(cutoff) = ChronoDuration::try_days(i64::from(days))
                    .and_then(|age| now.checked_sub_signed(age))
                else {
                    tracing::debug!(days, "Retention cutoff out of range, nothing expires");
                    return Vec::new();
                };
                delete_where(episodes, |ep| ep.published_at < cutoff)
            }
            RetentionPolicy::DeleteAfterPlayed => delete_where(episodes, |ep| ep.is_played),
        }
    }
}

impl StorageEvaluatorPort for StorageEvictionEvaluator {
    fn evaluate(&self, policy: RetentionPolicy, episodes: &[Episode]) -> Vec<StorageAction> {
        Self::evaluate(self, policy, episodes, Utc::now())
    }
}

fn keep_latest(episodes: &[Episode], keep: usize) -> Vec<StorageAction> {
    let mut newest_first: Vec<&Episode> = episodes.iter().collect();
    newest_first.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    newest_first
        .into_iter()
        .skip(keep)
        .filter(|ep| !ep.has_preserved_state())
        .map(|ep| StorageAction::DeleteEpisode(ep.id.clone()))
        .collect()
}

fn delete_where(episodes: &[Episode], expired: impl Fn(&Episode) -> bool) -> Vec<StorageAction> {
    episodes
        .iter()
        .filter(|ep| expired(ep) && !ep.has_preserved_state())
        .map(|ep| StorageAction::DeleteEpisode(ep.id.clone()))
        .collect()
}
