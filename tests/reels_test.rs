//! Reel tray reconciliation, cool-down and refresh loop.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use inbox_sync::collection::CollectionEvent;
use inbox_sync::registry::UserRegistry;
use inbox_sync::traits::SharedRemote;
use inbox_sync::{RefreshOutcome, ReelSyncEngine, SyncConfig};

fn engine(remote: &MockRemoteClient) -> ReelSyncEngine {
    ReelSyncEngine::new(
        SharedRemote::with_client(Arc::new(remote.clone())),
        UserRegistry::new(),
        &SyncConfig::default(),
    )
}

fn signed_in_remote() -> MockRemoteClient {
    MockRemoteClient::authenticated(me())
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_keeps_surviving_reels() {
    let remote = signed_in_remote();
    let reels = engine(&remote);

    remote.set_reel_tray(vec![reel("A", 2), reel("B", 3), reel("C", 4)]);
    assert_eq!(reels.refresh().await, RefreshOutcome::Applied);
    let before = reels.reels().await.unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    let mut b = reel("B", 3);
    b.latest_reel_media = Some(1_700_000_000);
    remote.set_reel_tray(vec![b, reel("C", 4), reel("D", 5)]);
    assert_eq!(reels.refresh().await, RefreshOutcome::Applied);
    let after = reels.reels().await.unwrap();

    let ids: Vec<&str> = after.iter().map(|(_, r)| r.id.as_str()).collect();
    assert_eq!(ids, vec!["B", "C", "D"]);
    // B and C keep their handles, D is new
    assert_eq!(after[0].0, before[1].0);
    assert_eq!(after[1].0, before[2].0);
    assert!(before.iter().all(|(h, _)| *h != after[2].0));
    assert_eq!(after[0].1.latest_reel_media, Some(1_700_000_000));
}

#[tokio::test(start_paused = true)]
async fn test_identical_tray_publishes_nothing() {
    let remote = signed_in_remote();
    let reels = engine(&remote);
    let mut events = reels.subscribe();

    remote.set_reel_tray(vec![reel("A", 2), reel("B", 3)]);
    reels.refresh().await;
    assert!(matches!(events.try_recv(), Ok(CollectionEvent::Changed { .. })));

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(reels.refresh().await, RefreshOutcome::Applied);
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_allows_one_fetch() {
    let remote = signed_in_remote();
    remote.set_reel_tray(vec![reel("A", 2)]);
    let reels = engine(&remote);

    assert_eq!(reels.refresh().await, RefreshOutcome::Applied);
    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(reels.refresh().await, RefreshOutcome::CoolingDown);
    assert_eq!(remote.call_count("fetch_reel_tray"), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(reels.refresh().await, RefreshOutcome::Applied);
    assert_eq!(remote.call_count("fetch_reel_tray"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_refreshes_fetch_once() {
    let remote = signed_in_remote();
    remote.set_reel_tray(vec![reel("A", 2)]);
    remote.set_delay(Some(Duration::from_secs(1)));
    let reels = engine(&remote);

    let (a, b) = tokio::join!(reels.refresh(), reels.refresh());
    let mut outcomes = vec![a, b];
    outcomes.sort_by_key(|o| format!("{:?}", o));
    assert_eq!(outcomes, vec![RefreshOutcome::Applied, RefreshOutcome::CoolingDown]);
    assert_eq!(remote.call_count("fetch_reel_tray"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_does_not_start_cooldown() {
    let remote = signed_in_remote();
    remote.set_reel_tray(vec![reel("A", 2)]);
    remote.set_should_fail("fetch_reel_tray", true);
    let reels = engine(&remote);

    assert_eq!(reels.refresh().await, RefreshOutcome::Skipped);
    remote.set_should_fail("fetch_reel_tray", false);
    assert_eq!(reels.refresh().await, RefreshOutcome::Applied);
}

#[tokio::test(start_paused = true)]
async fn test_empty_tray_keeps_current_reels() {
    let remote = signed_in_remote();
    remote.set_reel_tray(vec![reel("A", 2)]);
    let reels = engine(&remote);
    reels.refresh().await;

    tokio::time::sleep(Duration::from_secs(11)).await;
    remote.set_reel_tray(Vec::new());
    assert_eq!(reels.refresh().await, RefreshOutcome::Skipped);
    assert_eq!(reels.reels().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restarting_loop_keeps_one_timer() {
    let remote = signed_in_remote();
    remote.set_reel_tray(vec![reel("A", 2)]);
    let reels = engine(&remote);

    reels.start_loop();
    tokio::time::sleep(Duration::from_secs(150)).await;
    reels.start_loop();
    tokio::time::sleep(Duration::from_secs(16 * 60)).await;

    // Second loop fires at 7.5, 12.5 and 17.5 minutes
    assert_eq!(remote.call_count("fetch_reel_tray"), 3);
    assert!(reels.is_loop_running());
    reels.stop();
}

#[tokio::test(start_paused = true)]
async fn test_stopped_loop_never_fetches() {
    let remote = signed_in_remote();
    remote.set_reel_tray(vec![reel("A", 2)]);
    let reels = engine(&remote);

    reels.stop();
    reels.start_loop();
    reels.stop();
    reels.stop();
    tokio::time::sleep(Duration::from_secs(20 * 60)).await;

    assert_eq!(remote.call_count("fetch_reel_tray"), 0);
    assert!(!reels.is_loop_running());
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_fetch_still_applies() {
    let remote = signed_in_remote();
    remote.set_reel_tray(vec![reel("A", 2)]);
    remote.set_delay(Some(Duration::from_secs(30)));
    let reels = engine(&remote);

    reels.start_loop();
    // First periodic fetch starts at 300 s and is still waiting on the server
    tokio::time::sleep(Duration::from_secs(310)).await;
    reels.stop();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(reels.reels().await.unwrap().len(), 1);
    assert_eq!(remote.call_count("fetch_reel_tray"), 1);

    tokio::time::sleep(Duration::from_secs(20 * 60)).await;
    assert_eq!(remote.call_count("fetch_reel_tray"), 1);
    assert!(!reels.is_loop_running());
}

#[tokio::test]
async fn test_reply_to_story_creates_missing_thread() {
    let remote = signed_in_remote();
    remote.set_created_thread(thread("88", &[7]));
    let reels = engine(&remote);

    reels.reply_to_story(7, "123", "nice").await.unwrap();

    assert!(remote.calls().contains(&RemoteCall::SendReelShare {
        owner_id: 7,
        media_id: "123_7".to_string(),
        thread_id: "88".to_string(),
        text: "nice".to_string(),
    }));
}
