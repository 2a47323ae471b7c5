//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where the download subsystem is wired
//! together for the CLI adapter. The coordinator receives its downloader,
//! the storage evaluator and a broadcast emitter here; handlers only see the
//! composed [`CliContext`].

use std::path::Path;
use std::sync::Arc;

use podfetch_core::ports::DownloaderPort;
use podfetch_core::settings::{DownloadSettings, validate_settings};
use podfetch_download::{
    BroadcastEmitter, CoordinatorConfig, CoordinatorDeps, DownloadCoordinator,
    StorageEvictionEvaluator,
};

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Download settings after file loading and overrides.
    pub settings: DownloadSettings,
}

impl CliConfig {
    /// Built-in defaults.
    pub fn with_defaults() -> Self {
        Self {
            settings: DownloadSettings::with_defaults(),
        }
    }

    /// Load settings from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let settings = match path {
            Some(path) => DownloadSettings::load(path)?,
            None => DownloadSettings::with_defaults(),
        };
        Ok(Self { settings })
    }

    /// Re-check settings after command-line overrides were merged in.
    pub fn validate(&self) -> Result<(), CliError> {
        validate_settings(&self.settings).map_err(CliError::from)
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    /// The running coordinator.
    pub coordinator: Arc<DownloadCoordinator>,
    /// Event fan-out the coordinator publishes to.
    pub events: BroadcastEmitter,
    /// Settings the coordinator was built from.
    pub settings: DownloadSettings,
}

/// Compose a coordinator around `downloader`.
///
/// Must be called inside a Tokio runtime; the coordinator spawns its event
/// pump immediately.
pub fn bootstrap(config: CliConfig, downloader: Arc<dyn DownloaderPort>) -> CliContext {
    let events = BroadcastEmitter::new(config.settings.effective_event_channel_capacity());
    let coordinator = DownloadCoordinator::new(CoordinatorDeps {
        downloader,
        evaluator: Arc::new(StorageEvictionEvaluator::new()),
        event_emitter: Arc::new(events.clone()),
        config: CoordinatorConfig::from_settings(&config.settings),
    });

    tracing::debug!(
        max_concurrent = coordinator.config().max_concurrent_downloads,
        max_retries = coordinator.config().retry_policy.max_retry_count(),
        "Download coordinator ready"
    );

    CliContext {
        coordinator,
        events,
        settings: config.settings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    use crate::simulator::SimulatedDownloader;

    #[test]
    fn test_load_without_path_uses_defaults() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config.settings.effective_max_concurrent_downloads(), 1);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_concurrent_downloads": 0}}"#).unwrap();

        let err = CliConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_applies_settings() {
        let mut config = CliConfig::with_defaults();
        config.settings.max_concurrent_downloads = Some(3);

        let ctx = bootstrap(
            config,
            Arc::new(SimulatedDownloader::new(Duration::from_millis(5))),
        );
        assert_eq!(ctx.coordinator.config().max_concurrent_downloads, 3);
        assert_eq!(ctx.events.subscriber_count(), 0);
    }
}
