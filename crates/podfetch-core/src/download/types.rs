//! Core domain types for downloads.
//!
//! Pure data types with no I/O dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Episode;

/// Canonical identifier for a download task.
///
/// Task ids are opaque strings. Tasks created through [`DownloadTask::from_episode`]
/// get a random UUID v4; callers may supply their own ids for tests or replays.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a task id from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random task id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Token identifying one transfer attempt for a task.
///
/// A new lease is minted every time a task is handed to the downloader, so
/// events from a superseded transfer (paused, cancelled, restarted) can be
/// told apart from events of the live one. Later leases compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LeaseId(pub u64);

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lease-{}", self.0)
    }
}

/// Ordering hint used to pick which pending task starts next.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Processed after normal and high priority tasks.
    Low = 0,
    /// Default priority.
    #[default]
    Normal = 1,
    /// Processed before everything else.
    High = 2,
}

impl Priority {
    /// String form used in logs and the CLI.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much the size estimate of a task can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeConfidence {
    /// Taken from the feed enclosure length.
    Reported,
    /// Fallback constant; the real size is unknown.
    Fallback,
}

/// Estimated download size of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatedSize {
    /// Size in bytes.
    pub bytes: u64,
    /// Where the figure came from.
    pub confidence: SizeConfidence,
}

impl EstimatedSize {
    /// Size reported by episode metadata.
    #[must_use]
    pub const fn reported(bytes: u64) -> Self {
        Self {
            bytes,
            confidence: SizeConfidence::Reported,
        }
    }

    /// Low-confidence fallback estimate.
    #[must_use]
    pub const fn fallback(bytes: u64) -> Self {
        Self {
            bytes,
            confidence: SizeConfidence::Fallback,
        }
    }
}

/// One requested download of a single episode's audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Unique task identifier (enforced by the queue on insert).
    pub id: TaskId,
    /// Episode this task downloads.
    pub episode_id: String,
    /// Podcast the episode belongs to.
    pub podcast_id: String,
    /// Remote audio location.
    pub audio_url: String,
    /// Display title.
    pub title: String,
    /// Expected size, if known or estimated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_size: Option<EstimatedSize>,
    /// Scheduling priority.
    pub priority: Priority,
    /// Number of failed attempts so far.
    pub retry_count: u32,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

impl DownloadTask {
    /// Create a task with an explicit id and no size estimate.
    pub fn new(
        id: impl Into<TaskId>,
        episode_id: impl Into<String>,
        podcast_id: impl Into<String>,
        audio_url: impl Into<String>,
        title: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            id: id.into(),
            episode_id: episode_id.into(),
            podcast_id: podcast_id.into(),
            audio_url: audio_url.into(),
            title: title.into(),
            estimated_size: None,
            priority,
            retry_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Build a task from episode metadata.
    ///
    /// Uses the enclosure length when the feed reports one, otherwise the
    /// `fallback_size_bytes` estimate marked as low confidence.
    #[must_use]
    pub fn from_episode(episode: &Episode, priority: Priority, fallback_size_bytes: u64) -> Self {
        let estimated_size = episode.enclosure_length.filter(|len| *len > 0).map_or(
            EstimatedSize::fallback(fallback_size_bytes),
            EstimatedSize::reported,
        );

        Self {
            id: TaskId::generate(),
            episode_id: episode.id.clone(),
            podcast_id: episode.podcast_id.clone(),
            audio_url: episode.audio_url.clone(),
            title: episode.title.clone(),
            estimated_size: Some(estimated_size),
            priority,
            retry_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Set the size estimate.
    #[must_use]
    pub const fn with_estimated_size(mut self, size: EstimatedSize) -> Self {
        self.estimated_size = Some(size);
        self
    }
}

/// Lifecycle state of a download record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Waiting to be started.
    Pending,
    /// Handed to the downloader.
    Downloading,
    /// Suspended by the user; progress is kept.
    Paused,
    /// Finished successfully.
    Completed,
    /// Last attempt failed; can be retried.
    Failed,
    /// Cancelled by the user.
    Cancelled,
}

impl DownloadState {
    /// String form used in logs and persisted snapshots.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states never change again (short of removal).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// Cancellation is allowed from every non-terminal state, including
    /// `Failed`, so a pending automatic retry can be called off.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Downloading | Self::Cancelled)
                | (
                    Self::Downloading,
                    Self::Paused | Self::Completed | Self::Failed | Self::Cancelled
                )
                | (Self::Paused, Self::Downloading | Self::Cancelled)
                | (Self::Failed, Self::Pending | Self::Cancelled)
        )
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task together with its mutable download state.
///
/// This is the unit the queue stores and mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// The task being tracked.
    pub task: DownloadTask,
    /// Current lifecycle state.
    pub state: DownloadState,
    /// Fraction completed, always within `[0, 1]`.
    pub progress: f64,
    /// Message of the most recent failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Locator of the downloaded file, reported on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_file: Option<String>,
}

impl DownloadRecord {
    /// Create a pending record for a freshly added task.
    #[must_use]
    pub const fn pending(task: DownloadTask) -> Self {
        Self {
            task,
            state: DownloadState::Pending,
            progress: 0.0,
            last_error: None,
            local_file: None,
        }
    }

    /// Id of the underlying task.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.task.id
    }

    /// Set progress, clamping to `[0, 1]`.
    pub fn set_progress(&mut self, fraction: f64) {
        self.progress = clamp_fraction(fraction);
    }
}

/// Clamp a reported fraction into `[0, 1]`. NaN becomes 0.
#[must_use]
pub fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(enclosure_length: Option<u64>) -> Episode {
        Episode::new("ep-1", "pod-1", "Pilot", "https://cdn.example/ep1.mp3", Utc::now())
            .with_enclosure_length(enclosure_length)
    }

    #[test]
    fn priority_orders_high_above_low() {
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn from_episode_uses_reported_size() {
        let task = DownloadTask::from_episode(&episode(Some(1234)), Priority::High, 99);
        assert_eq!(task.estimated_size, Some(EstimatedSize::reported(1234)));
        assert_eq!(task.episode_id, "ep-1");
        assert_eq!(task.podcast_id, "pod-1");
        assert_eq!(task.retry_count, 0);
    }

    #[test]
    fn from_episode_falls_back_to_low_confidence_estimate() {
        let task = DownloadTask::from_episode(&episode(None), Priority::Low, 99);
        assert_eq!(task.estimated_size, Some(EstimatedSize::fallback(99)));

        let zero = DownloadTask::from_episode(&episode(Some(0)), Priority::Low, 99);
        assert_eq!(
            zero.estimated_size.map(|s| s.confidence),
            Some(SizeConfidence::Fallback)
        );
    }

    #[test]
    fn generated_task_ids_are_unique() {
        let a = DownloadTask::from_episode(&episode(None), Priority::Normal, 1);
        let b = DownloadTask::from_episode(&episode(None), Priority::Normal, 1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn transition_table() {
        use DownloadState::{Cancelled, Completed, Downloading, Failed, Paused, Pending};

        assert!(Pending.can_transition_to(Downloading));
        assert!(Downloading.can_transition_to(Paused));
        assert!(Downloading.can_transition_to(Completed));
        assert!(Downloading.can_transition_to(Failed));
        assert!(Paused.can_transition_to(Downloading));
        assert!(Failed.can_transition_to(Pending));
        assert!(Failed.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Paused));
        assert!(!Paused.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Cancelled));
        assert!(!Failed.can_transition_to(Downloading));
    }

    #[test]
    fn clamp_fraction_handles_out_of_range_values() {
        assert!((clamp_fraction(1.7) - 1.0).abs() < f64::EPSILON);
        assert!(clamp_fraction(-0.2).abs() < f64::EPSILON);
        assert!(clamp_fraction(f64::NAN).abs() < f64::EPSILON);
        assert!((clamp_fraction(0.25) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn task_id_serializes_transparently() {
        let json = serde_json::to_string(&TaskId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
