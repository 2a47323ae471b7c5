//! Integration tests for `AutoDownloadTrigger`.

mod common;

use std::sync::Arc;

use common::{Harness, episode};
use podfetch_core::domain::Podcast;
use podfetch_core::download::{DownloadState, Priority};
use podfetch_download::AutoDownloadTrigger;

fn podcast(subscribed: bool) -> Podcast {
    Podcast::new("pod", "The Pod", subscribed)
}

#[tokio::test]
async fn subscribed_podcast_queues_new_episode() {
    let mut h = Harness::new();
    let trigger = AutoDownloadTrigger::new(Arc::clone(&h.coordinator));

    let id = trigger
        .on_new_episode_detected(&episode("new", 0), &podcast(true))
        .await
        .unwrap();

    let (task, _sink) = h.next_start().await;
    assert_eq!(task.id, id);
    assert_eq!(task.priority, Priority::Normal);
    assert_eq!(task.podcast_id, "pod");
}

#[tokio::test]
async fn unsubscribed_podcast_is_skipped() {
    let h = Harness::new();
    let trigger = AutoDownloadTrigger::new(Arc::clone(&h.coordinator));

    let queued = trigger
        .on_new_episode_detected(&episode("new", 0), &podcast(false))
        .await;

    assert!(queued.is_none());
    assert!(h.coordinator.get_download_queue().await.is_empty());
}

#[tokio::test]
async fn override_wins_over_subscription() {
    let h = Harness::new();
    let trigger = AutoDownloadTrigger::new(Arc::clone(&h.coordinator));

    trigger.set_auto_download(false, "pod").await;
    assert!(
        trigger
            .on_new_episode_detected(&episode("a", 0), &podcast(true))
            .await
            .is_none()
    );

    trigger.configure_auto_download(true, "pod").await;
    assert!(
        trigger
            .on_new_episode_detected(&episode("b", 0), &podcast(false))
            .await
            .is_some()
    );

    let queue = h.coordinator.get_download_queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].episode_id, "b");
}

#[tokio::test]
async fn setting_query_defaults_to_false() {
    let h = Harness::new();
    let trigger = AutoDownloadTrigger::new(Arc::clone(&h.coordinator));

    assert!(!trigger.get_auto_download_setting("pod").await);
    trigger.set_auto_download(true, "pod").await;
    assert!(trigger.get_auto_download_setting("pod").await);
    assert!(!trigger.get_auto_download_setting("elsewhere").await);
}

#[tokio::test]
async fn custom_priority_is_used() {
    let h = Harness::new();
    let trigger = AutoDownloadTrigger::with_priority(Arc::clone(&h.coordinator), Priority::Low);

    trigger
        .on_new_episode_detected(&episode("a", 0), &podcast(true))
        .await
        .unwrap();

    let record = h.coordinator.get_record("a").await.unwrap();
    assert_eq!(record.task.priority, Priority::Low);
}

#[tokio::test]
async fn already_queued_episode_is_not_requeued() {
    let mut h = Harness::new();
    let trigger = AutoDownloadTrigger::new(Arc::clone(&h.coordinator));
    let ep = episode("a", 0);

    h.coordinator
        .add_download(&ep, Priority::High)
        .await
        .unwrap();
    h.wait_for_state("a", DownloadState::Downloading).await;

    assert!(
        trigger
            .on_new_episode_detected(&ep, &podcast(true))
            .await
            .is_none()
    );
    assert_eq!(h.coordinator.get_download_queue().await.len(), 1);
}
