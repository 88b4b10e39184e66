//! Common test utilities for integration tests.
//!
//! Provides model fixtures and a builder wiring a [`SessionOrchestrator`] to
//! the scriptable doubles from `inbox_sync::adapters::mock`.
//!
//! # Example
//!
//! ```ignore
//! let t = TestSessionBuilder::new().signed_in().build().await;
//! t.remote.set_inbox_page(None, inbox_page(vec![thread("5", &[2])], None));
//! t.session.inbox().update_inbox().await.unwrap();
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;
use std::time::Duration;

use inbox_sync::models::{BaseUser, DirectItem, InboxPage, Reel, Thread, UserId};
use inbox_sync::{SessionOrchestrator, StaleSelectionPolicy, SyncConfig};

/// The user every signed-in test session belongs to.
pub const ME: UserId = 1;

pub fn user(pk: UserId) -> BaseUser {
    BaseUser::new(pk, format!("user{}", pk)).with_full_name(format!("User {}", pk))
}

pub fn me() -> BaseUser {
    user(ME)
}

/// Canonical thread `id` with the given participants.
pub fn thread(id: &str, participants: &[UserId]) -> Thread {
    Thread::new(id, participants.iter().copied().map(user).collect())
}

/// Thread carrying one text item, so it has something to mark seen.
pub fn thread_with_item(id: &str, participants: &[UserId], item_id: &str) -> Thread {
    let mut thread = thread(id, participants);
    let sender = participants.first().copied().unwrap_or(ME);
    thread
        .items
        .push(DirectItem::text(item_id, sender, format!("message {}", item_id)));
    thread
}

pub fn reel(id: &str, owner: UserId) -> Reel {
    Reel::new(id, user(owner))
}

/// Inbox page; `cursor` set means an older page exists.
pub fn inbox_page(threads: Vec<Thread>, cursor: Option<&str>) -> InboxPage {
    InboxPage {
        threads,
        oldest_cursor: cursor.map(str::to_string),
        has_older: cursor.is_some(),
        unseen_count: 0,
    }
}

/// Builder for orchestrators backed by mocks.
pub struct TestSessionBuilder {
    config: SyncConfig,
    signed_in: bool,
}

impl TestSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default().with_data_dir(std::env::temp_dir().join("inbox-sync-tests")),
            signed_in: false,
        }
    }

    /// Sign the remote in after `initialize`.
    pub fn signed_in(mut self) -> Self {
        self.signed_in = true;
        self
    }

    pub fn with_stale_selection(mut self, policy: StaleSelectionPolicy) -> Self {
        self.config = self.config.with_stale_selection(policy);
        self
    }

    pub fn with_reel_timing(mut self, interval: Duration, cooldown: Duration) -> Self {
        self.config = self
            .config
            .with_reel_refresh_interval(interval)
            .with_reel_cooldown(cooldown);
        self
    }

    /// Build and initialize the orchestrator.
    pub async fn build(self) -> TestSession {
        let mocks = MockSet::new();
        let session = SessionOrchestrator::new(
            self.config,
            Arc::new(mocks.factory.clone()),
            Arc::new(mocks.cache.clone()),
            Arc::new(mocks.faults.clone()),
        );
        session.initialize().await.expect("initialize");
        if self.signed_in {
            mocks.remote.sign_in(me());
        }
        TestSession {
            session: Arc::new(session),
            remote: mocks.remote,
            factory: mocks.factory,
            cache: mocks.cache,
            faults: mocks.faults,
        }
    }
}

impl Default for TestSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An initialized orchestrator plus handles to the doubles behind it.
pub struct TestSession {
    pub session: Arc<SessionOrchestrator>,
    pub remote: MockRemoteClient,
    pub factory: MockRemoteFactory,
    pub cache: InMemoryCache,
    pub faults: RecordingFaultReporter,
}
