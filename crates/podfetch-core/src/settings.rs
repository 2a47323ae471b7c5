//! Download settings and validation.
//!
//! This module contains the settings that shape queue scheduling, retries and
//! progress publication. These are pure domain types; loading from a JSON
//! file is the only I/O performed here.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::download::Priority;

/// Maximum number of automatic retries after failed transfers.
pub const MAX_RETRY_COUNT: u32 = 3;

/// Backoff table for automatic retries, in seconds.
pub const RETRY_DELAYS_SECS: [u64; 3] = [5, 15, 60];

/// Priority used for auto-downloaded episodes.
pub const DEFAULT_AUTO_DOWNLOAD_PRIORITY: Priority = Priority::Normal;

/// Number of transfers the coordinator starts on its own.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: u32 = 1;

/// Minimum interval between progress events for one task.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 100;

/// Size assumed for episodes whose feed does not report an enclosure length.
pub const FALLBACK_ESTIMATED_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Buffered events per broadcast subscriber.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Download settings structure.
///
/// All fields are optional to support partial files and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DownloadSettings {
    /// Automatic retries before a task needs a manual retry (0-10).
    pub max_retry_count: Option<u32>,

    /// Backoff table in seconds; the last entry repeats.
    pub retry_delays_secs: Option<Vec<u64>>,

    /// Transfers started by the scheduler at once (1-8).
    pub max_concurrent_downloads: Option<u32>,

    /// Priority for auto-downloaded episodes.
    pub default_auto_download_priority: Option<Priority>,

    /// Minimum milliseconds between progress events per task.
    pub progress_interval_ms: Option<u64>,

    /// Size estimate used when an episode reports none.
    pub fallback_estimated_size_bytes: Option<u64>,

    /// Broadcast buffer per subscriber.
    pub event_channel_capacity: Option<usize>,
}

impl DownloadSettings {
    /// Create settings with every default filled in.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            max_retry_count: Some(MAX_RETRY_COUNT),
            retry_delays_secs: Some(RETRY_DELAYS_SECS.to_vec()),
            max_concurrent_downloads: Some(DEFAULT_MAX_CONCURRENT_DOWNLOADS),
            default_auto_download_priority: Some(DEFAULT_AUTO_DOWNLOAD_PRIORITY),
            progress_interval_ms: Some(DEFAULT_PROGRESS_INTERVAL_MS),
            fallback_estimated_size_bytes: Some(FALLBACK_ESTIMATED_SIZE_BYTES),
            event_channel_capacity: Some(EVENT_CHANNEL_CAPACITY),
        }
    }

    /// Load settings from a JSON file and validate them.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let settings: Self =
            serde_json::from_str(&raw).map_err(|e| SettingsError::Parse(e.to_string()))?;
        validate_settings(&settings)?;

        tracing::debug!(path = %path.display(), ?settings, "Loaded download settings");
        Ok(settings)
    }

    #[must_use]
    pub fn effective_max_retry_count(&self) -> u32 {
        self.max_retry_count.unwrap_or(MAX_RETRY_COUNT)
    }

    /// Backoff table as durations (never empty).
    #[must_use]
    pub fn effective_retry_delays(&self) -> Vec<Duration> {
        match &self.retry_delays_secs {
            Some(delays) if !delays.is_empty() => {
                delays.iter().copied().map(Duration::from_secs).collect()
            }
            _ => RETRY_DELAYS_SECS
                .iter()
                .copied()
                .map(Duration::from_secs)
                .collect(),
        }
    }

    #[must_use]
    pub fn effective_max_concurrent_downloads(&self) -> usize {
        self.max_concurrent_downloads
            .unwrap_or(DEFAULT_MAX_CONCURRENT_DOWNLOADS)
            .max(1) as usize
    }

    #[must_use]
    pub fn effective_auto_download_priority(&self) -> Priority {
        self.default_auto_download_priority
            .unwrap_or(DEFAULT_AUTO_DOWNLOAD_PRIORITY)
    }

    #[must_use]
    pub fn effective_progress_interval(&self) -> Duration {
        Duration::from_millis(
            self.progress_interval_ms
                .unwrap_or(DEFAULT_PROGRESS_INTERVAL_MS),
        )
    }

    #[must_use]
    pub fn effective_fallback_size_bytes(&self) -> u64 {
        self.fallback_estimated_size_bytes
            .unwrap_or(FALLBACK_ESTIMATED_SIZE_BYTES)
    }

    #[must_use]
    pub fn effective_event_channel_capacity(&self) -> usize {
        self.event_channel_capacity
            .filter(|c| *c > 0)
            .unwrap_or(EVENT_CHANNEL_CAPACITY)
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref retries) = other.max_retry_count {
            self.max_retry_count = *retries;
        }
        if let Some(ref delays) = other.retry_delays_secs {
            self.retry_delays_secs.clone_from(delays);
        }
        if let Some(ref concurrent) = other.max_concurrent_downloads {
            self.max_concurrent_downloads = *concurrent;
        }
        if let Some(ref priority) = other.default_auto_download_priority {
            self.default_auto_download_priority = *priority;
        }
        if let Some(ref interval) = other.progress_interval_ms {
            self.progress_interval_ms = *interval;
        }
        if let Some(ref size) = other.fallback_estimated_size_bytes {
            self.fallback_estimated_size_bytes = *size;
        }
        if let Some(ref capacity) = other.event_channel_capacity {
            self.event_channel_capacity = *capacity;
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset field to its default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub max_retry_count: Option<Option<u32>>,
    pub retry_delays_secs: Option<Option<Vec<u64>>>,
    pub max_concurrent_downloads: Option<Option<u32>>,
    pub default_auto_download_priority: Option<Option<Priority>>,
    pub progress_interval_ms: Option<Option<u64>>,
    pub fallback_estimated_size_bytes: Option<Option<u64>>,
    pub event_channel_capacity: Option<Option<usize>>,
}

/// Settings loading and validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings from {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse settings: {0}")]
    Parse(String),

    #[error("Max retry count must be between 0 and 10, got {0}")]
    InvalidRetryCount(u32),

    #[error("Retry delays cannot be empty")]
    EmptyRetryDelays,

    #[error("Max concurrent downloads must be between 1 and 8, got {0}")]
    InvalidConcurrency(u32),

    #[error("Event channel capacity must be positive")]
    InvalidChannelCapacity,
}

/// Validate settings values.
pub fn validate_settings(settings: &DownloadSettings) -> Result<(), SettingsError> {
    if let Some(retries) = settings.max_retry_count {
        if retries > 10 {
            return Err(SettingsError::InvalidRetryCount(retries));
        }
    }

    if settings
        .retry_delays_secs
        .as_ref()
        .is_some_and(Vec::is_empty)
    {
        return Err(SettingsError::EmptyRetryDelays);
    }

    if let Some(concurrent) = settings.max_concurrent_downloads {
        if !(1..=8).contains(&concurrent) {
            return Err(SettingsError::InvalidConcurrency(concurrent));
        }
    }

    if settings.event_channel_capacity == Some(0) {
        return Err(SettingsError::InvalidChannelCapacity);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = DownloadSettings::with_defaults();
        assert_eq!(settings.max_retry_count, Some(3));
        assert_eq!(settings.retry_delays_secs, Some(vec![5, 15, 60]));
        assert_eq!(settings.max_concurrent_downloads, Some(1));
        assert_eq!(
            settings.default_auto_download_priority,
            Some(Priority::Normal)
        );
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_effective_values_fall_back_to_constants() {
        let settings = DownloadSettings::default();
        assert_eq!(settings.effective_max_retry_count(), MAX_RETRY_COUNT);
        assert_eq!(
            settings.effective_retry_delays(),
            vec![
                Duration::from_secs(5),
                Duration::from_secs(15),
                Duration::from_secs(60)
            ]
        );
        assert_eq!(settings.effective_max_concurrent_downloads(), 1);
        assert_eq!(
            settings.effective_progress_interval(),
            Duration::from_millis(100)
        );
        assert_eq!(
            settings.effective_fallback_size_bytes(),
            FALLBACK_ESTIMATED_SIZE_BYTES
        );
    }

    #[test]
    fn test_validate_retry_count_too_large() {
        let settings = DownloadSettings {
            max_retry_count: Some(11),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidRetryCount(11))
        ));
    }

    #[test]
    fn test_validate_empty_delays() {
        let settings = DownloadSettings {
            retry_delays_secs: Some(vec![]),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyRetryDelays)
        ));
    }

    #[test]
    fn test_validate_concurrency_bounds() {
        for bad in [0, 9] {
            let settings = DownloadSettings {
                max_concurrent_downloads: Some(bad),
                ..Default::default()
            };
            assert!(matches!(
                validate_settings(&settings),
                Err(SettingsError::InvalidConcurrency(n)) if n == bad
            ));
        }
    }

    #[test]
    fn test_merge_settings() {
        let mut settings = DownloadSettings::with_defaults();
        let update = SettingsUpdate {
            max_concurrent_downloads: Some(Some(2)),
            retry_delays_secs: Some(None),
            ..Default::default()
        };
        settings.merge(&update);

        assert_eq!(settings.max_concurrent_downloads, Some(2));
        assert_eq!(settings.retry_delays_secs, None);
        assert_eq!(settings.max_retry_count, Some(3)); // Unchanged
        assert_eq!(settings.effective_retry_delays().len(), 3);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_concurrent_downloads": 2, "retry_delays_secs": [1, 2] }}"#)
            .unwrap();

        let settings = DownloadSettings::load(file.path()).unwrap();
        assert_eq!(settings.effective_max_concurrent_downloads(), 2);
        assert_eq!(
            settings.effective_retry_delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        assert_eq!(settings.effective_max_retry_count(), MAX_RETRY_COUNT);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_concurrent_downloads": 0 }}"#).unwrap();
        assert!(matches!(
            DownloadSettings::load(file.path()),
            Err(SettingsError::InvalidConcurrency(0))
        ));

        let mut garbage = tempfile::NamedTempFile::new().unwrap();
        write!(garbage, "not json").unwrap();
        assert!(matches!(
            DownloadSettings::load(garbage.path()),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = DownloadSettings::load(Path::new("/nonexistent/podfetch.json")).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
