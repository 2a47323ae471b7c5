//! Simulate command handler.
//!
//! Detects a batch of demo episodes for a subscribed podcast, lets the
//! auto-download trigger queue them, and prints progress while the
//! simulated downloader works through the queue. Once every record has
//! settled the optional retention policy is applied and its report printed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast::error::RecvError;

use podfetch_core::domain::{Episode, Podcast, RetentionPolicy};
use podfetch_core::download::{DownloadEvent, DownloadState, DownloadSummary};
use podfetch_core::settings::SettingsUpdate;
use podfetch_download::AutoDownloadTrigger;

use crate::bootstrap::{CliConfig, bootstrap};
use crate::presentation::{format_progress, print_queue};
use crate::simulator::SimulatedDownloader;

/// Podcast every demo episode belongs to.
pub const DEMO_PODCAST_ID: &str = "demo";

/// Arguments for the simulate command.
#[derive(Debug, Clone)]
pub struct SimulateArgs {
    pub episodes: u32,
    pub fail: Vec<String>,
    pub policy: Option<RetentionPolicy>,
    pub retry_delay_secs: Option<u64>,
    pub step_interval: Duration,
}

/// `count` episodes of the demo podcast, `demo-1` being the newest.
pub fn demo_episodes(count: u32, now: DateTime<Utc>) -> Vec<Episode> {
    (1..=count)
        .map(|n| {
            let id = format!("demo-{n}");
            Episode::new(
                id.clone(),
                DEMO_PODCAST_ID,
                format!("Demo episode {n}"),
                format!("https://cdn.example.com/{DEMO_PODCAST_ID}/{id}.mp3"),
                now - chrono::Duration::days(i64::from(n - 1)),
            )
            .with_enclosure_length(Some(20_000_000 + u64::from(n) * 1_000_000))
        })
        .collect()
}

/// Whether a record will not change again without user action.
pub const fn is_settled(item: &DownloadSummary, max_retry_count: u32) -> bool {
    match item.state {
        DownloadState::Completed | DownloadState::Cancelled => true,
        DownloadState::Failed => item.retry_count >= max_retry_count,
        DownloadState::Pending | DownloadState::Downloading | DownloadState::Paused => false,
    }
}

/// Execute the simulate command.
pub async fn execute(mut config: CliConfig, args: SimulateArgs) -> Result<()> {
    if let Some(secs) = args.retry_delay_secs {
        config.settings.merge(&SettingsUpdate {
            retry_delays_secs: Some(Some(vec![secs])),
            ..SettingsUpdate::default()
        });
        config.validate()?;
    }

    let downloader = SimulatedDownloader::new(args.step_interval).failing(args.fail.clone());
    let ctx = bootstrap(config, Arc::new(downloader));

    let mut events = ctx.events.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(DownloadEvent::Progress { update }) => println!("{}", format_progress(&update)),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Progress printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let podcast = Podcast::new(DEMO_PODCAST_ID, "Demo Podcast", true);
    let trigger = AutoDownloadTrigger::with_priority(
        Arc::clone(&ctx.coordinator),
        ctx.settings.effective_auto_download_priority(),
    );
    let episodes = demo_episodes(args.episodes, Utc::now());
    for episode in &episodes {
        trigger.on_new_episode_detected(episode, &podcast).await;
    }

    let max_retry_count = ctx.coordinator.config().retry_policy.max_retry_count();
    let mut queue = ctx.coordinator.watch_queue();
    let settled = queue
        .wait_for(|items| items.iter().all(|item| is_settled(item, max_retry_count)))
        .await?
        .clone();

    println!();
    print_queue(&settled);

    if let Some(policy) = args.policy {
        let report = ctx
            .coordinator
            .apply_storage_policies(DEMO_PODCAST_ID, &episodes, policy)
            .await;
        println!();
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    ctx.coordinator.shutdown().await;
    printer.abort();
    Ok(())
}
