//! Story reel tray synchronization.
//!
//! [`ReelSyncEngine`] keeps the live reel tray in step with the server: each
//! refresh fetches the full tray and reconciles it into the collection owned by
//! the engine's dispatcher, preserving the handle of every reel that survives.
//!
//! Refreshes are rate limited by a cool-down after each successful refresh,
//! and a periodic loop refreshes on a fixed interval until stopped.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::collection::{Collection, CollectionEvent, Handle};
use crate::config::SyncConfig;
use crate::dispatch::Dispatcher;
use crate::error::{ErrorContext, InboxResult, ResultExt};
use crate::models::{Reel, UserId};
use crate::registry::UserRegistry;
use crate::traits::SharedRemote;

const EVENT_CAPACITY: usize = 64;

/// What a call to [`ReelSyncEngine::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A tray was fetched and reconciled (possibly with no visible change).
    Applied,
    /// A refresh succeeded too recently; nothing was fetched.
    CoolingDown,
    /// Nothing usable was fetched: no client, failure, or an empty tray.
    Skipped,
}

struct RefreshLoop {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshLoop {
    fn cancel(self) {
        let _ = self.cancel.send(true);
    }
}

/// Reel tray reconciliation engine.
///
/// Clones share the same tray, cool-down and loop.
#[derive(Clone)]
pub struct ReelSyncEngine {
    remote: SharedRemote,
    registry: UserRegistry,
    context: Dispatcher<Collection<Reel>>,
    events: broadcast::Sender<CollectionEvent>,
    /// Time of the last successful refresh. Held across a refresh so that
    /// concurrent callers queue up and see its result.
    last_success: Arc<tokio::sync::Mutex<Option<Instant>>>,
    refresh_loop: Arc<Mutex<Option<RefreshLoop>>>,
    interval: Duration,
    cooldown: Duration,
}

impl ReelSyncEngine {
    /// Create the engine and its owning context. Must be called inside a tokio runtime.
    pub fn new(remote: SharedRemote, registry: UserRegistry, config: &SyncConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            remote,
            registry,
            context: Dispatcher::spawn("reels", Collection::new()),
            events,
            last_success: Arc::new(tokio::sync::Mutex::new(None)),
            refresh_loop: Arc::new(Mutex::new(None)),
            interval: config.reel_refresh_interval,
            cooldown: config.reel_cooldown,
        }
    }

    /// Change notifications, one event per applied refresh.
    pub fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.events.subscribe()
    }

    /// Current tray in display order.
    pub async fn reels(&self) -> InboxResult<Vec<(Handle, Reel)>> {
        self.context
            .run(|reels| reels.snapshot())
            .await
            .context(ErrorContext::new("reels").with_component("reels"))
    }

    /// Fetch the tray and reconcile it, unless a refresh succeeded within the cool-down.
    pub async fn refresh(&self) -> RefreshOutcome {
        let mut last_success = self.last_success.lock().await;
        if let Some(at) = *last_success {
            if at.elapsed() < self.cooldown {
                tracing::debug!(since = ?at.elapsed(), "Reel refresh cooling down");
                return RefreshOutcome::CoolingDown;
            }
        }

        let remote = match self.remote.require_authenticated("fetch_reel_tray") {
            Ok(remote) => remote,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping reel refresh");
                return RefreshOutcome::Skipped;
            }
        };

        let tray = match remote.fetch_reel_tray().await {
            Ok(tray) => tray,
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "Reel tray fetch failed");
                return RefreshOutcome::Skipped;
            }
        };

        if tray.is_empty() {
            tracing::debug!("Reel tray fetch returned nothing, keeping current tray");
            return RefreshOutcome::Skipped;
        }

        self.registry.record_reels(&tray);

        let events = self.events.clone();
        let applied = self
            .context
            .run(move |reels| {
                let result = reels.reconcile(tray);
                let count = result.changes.len();
                if !result.is_noop() {
                    let _ = events.send(CollectionEvent::Changed {
                        changes: result.changes,
                    });
                }
                (count, reels.len())
            })
            .await;

        match applied {
            Ok((changes, total)) => {
                *last_success = Some(Instant::now());
                tracing::info!(changes, total, "Reel tray reconciled");
                RefreshOutcome::Applied
            }
            Err(e) => {
                tracing::debug!(error = %e, "Reel tray dropped, context closed");
                RefreshOutcome::Skipped
            }
        }
    }

    /// Start the periodic refresh loop, replacing any loop already running.
    ///
    /// The loop waits one interval before each refresh.
    pub fn start_loop(&self) {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let engine = self.clone();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = cancel_rx.changed() => break,
                }
                if *cancel_rx.borrow() {
                    break;
                }
                let outcome = engine.refresh().await;
                tracing::trace!(?outcome, "Periodic reel refresh");
            }
            tracing::debug!("Reel refresh loop stopped");
        });

        let previous = self
            .refresh_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(RefreshLoop {
                cancel: cancel_tx,
                task,
            });
        if let Some(previous) = previous {
            tracing::debug!("Replacing running reel refresh loop");
            previous.cancel();
        }
        tracing::info!(interval = ?self.interval, "Reel refresh loop started");
    }

    /// Cancel the loop. An in-flight refresh still completes and applies.
    pub fn stop(&self) {
        let current = self
            .refresh_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(current) = current {
            current.cancel();
            tracing::info!("Reel refresh loop cancelled");
        }
    }

    pub fn is_loop_running(&self) -> bool {
        self.refresh_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|l| !l.task.is_finished())
    }

    /// Reply to one story of `owner_id` in the direct thread with that user.
    pub async fn reply_to_story(&self, owner_id: UserId, story_id: &str, message: &str) -> InboxResult<()> {
        let ctx = || {
            ErrorContext::new("reply_to_story").with_component("reels")
        };
        let remote = self.remote.require_authenticated("reply_to_story")?;

        let mut thread = remote
            .find_thread_by_participants(&[owner_id])
            .await
            .with_context(ctx)?;
        if thread.is_placeholder() {
            thread = remote
                .create_group_thread(&[owner_id])
                .await
                .with_context(ctx)?;
        }
        self.registry.record_threads([&thread]);

        let media_id = format!("{}_{}", story_id, owner_id);
        remote
            .send_reel_share(owner_id, &media_id, &thread.thread_id, message)
            .await
            .with_context(|| ctx().with_thread_id(thread.thread_id.clone()))?;

        tracing::info!(owner_id, thread_id = %thread.thread_id, media_id = %media_id, "Story reply sent");
        Ok(())
    }
}

impl std::fmt::Debug for ReelSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReelSyncEngine")
            .field("context", &self.context)
            .field("interval", &self.interval)
            .field("cooldown", &self.cooldown)
            .field("loop_running", &self.is_loop_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockRemoteClient, RemoteCall};
    use crate::models::{BaseUser, Thread};

    fn reel(id: &str, latest: i64) -> Reel {
        let mut reel = Reel::new(id, BaseUser::new(id.len() as i64 + 100, id));
        reel.latest_reel_media = Some(latest);
        reel
    }

    fn engine(remote: &MockRemoteClient) -> ReelSyncEngine {
        ReelSyncEngine::new(
            SharedRemote::with_client(Arc::new(remote.clone())),
            UserRegistry::new(),
            &SyncConfig::default(),
        )
    }

    fn ids(reels: &[(Handle, Reel)]) -> Vec<&str> {
        reels.iter().map(|(_, r)| r.id.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_applies_tray() {
        let remote = MockRemoteClient::authenticated(BaseUser::new(1, "me"));
        remote.set_reel_tray(vec![reel("a", 1), reel("b", 1)]);
        let engine = engine(&remote);
        let mut events = engine.subscribe();

        assert_eq!(engine.refresh().await, RefreshOutcome::Applied);
        assert_eq!(ids(&engine.reels().await.unwrap()), vec!["a", "b"]);
        assert!(matches!(events.try_recv(), Ok(CollectionEvent::Changed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_blocks_second_fetch() {
        let remote = MockRemoteClient::authenticated(BaseUser::new(1, "me"));
        remote.set_reel_tray(vec![reel("a", 1)]);
        let engine = engine(&remote);

        assert_eq!(engine.refresh().await, RefreshOutcome::Applied);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(engine.refresh().await, RefreshOutcome::CoolingDown);
        assert_eq!(remote.call_count("fetch_reel_tray"), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(engine.refresh().await, RefreshOutcome::Applied);
        assert_eq!(remote.call_count("fetch_reel_tray"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_does_not_start_cooldown() {
        let remote = MockRemoteClient::authenticated(BaseUser::new(1, "me"));
        remote.set_reel_tray(vec![reel("a", 1)]);
        remote.set_should_fail("fetch_reel_tray", true);
        let engine = engine(&remote);

        assert_eq!(engine.refresh().await, RefreshOutcome::Skipped);
        remote.set_should_fail("fetch_reel_tray", false);
        assert_eq!(engine.refresh().await, RefreshOutcome::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_tray_keeps_current() {
        let remote = MockRemoteClient::authenticated(BaseUser::new(1, "me"));
        remote.set_reel_tray(vec![reel("a", 1)]);
        let engine = engine(&remote);
        engine.refresh().await;

        tokio::time::advance(Duration::from_secs(11)).await;
        remote.set_reel_tray(Vec::new());
        assert_eq!(engine.refresh().await, RefreshOutcome::Skipped);
        assert_eq!(ids(&engine.reels().await.unwrap()), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_without_loop_is_noop() {
        let remote = MockRemoteClient::authenticated(BaseUser::new(1, "me"));
        let engine = engine(&remote);
        engine.stop();
        assert!(!engine.is_loop_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_to_story_creates_thread_when_missing() {
        let remote = MockRemoteClient::authenticated(BaseUser::new(1, "me"));
        remote.set_created_thread(Thread::new("t-9", vec![BaseUser::new(9, "nine")]));
        let engine = engine(&remote);

        engine.reply_to_story(9, "3141", "nice").await.unwrap();

        let calls = remote.calls();
        assert!(calls.contains(&RemoteCall::CreateGroupThread { user_ids: vec![9] }));
        assert!(calls.contains(&RemoteCall::SendReelShare {
            owner_id: 9,
            media_id: "3141_9".to_string(),
            thread_id: "t-9".to_string(),
            text: "nice".to_string(),
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_to_story_requires_login() {
        let remote = MockRemoteClient::new();
        let engine = engine(&remote);
        let err = engine.reply_to_story(9, "1", "hi").await.unwrap_err();
        assert!(err.requires_reauth());
    }
}
