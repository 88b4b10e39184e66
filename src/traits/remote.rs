//! Remote protocol client abstraction.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{InboxError, InboxResult, RemoteError};
use crate::models::{
    BaseUser, InboxPage, LoginOutcome, PresenceValue, RecipientSearchResult, Reel, SessionData,
    Thread, UserId,
};

/// Client for the direct-messaging service.
///
/// Every call reports failure as a [`RemoteError`] value. Implementations must
/// not panic on protocol errors; the engines treat a failed call as "no change,
/// try again next cycle".
#[async_trait]
pub trait RemoteClient: Send + Sync {
    fn is_authenticated(&self) -> bool;

    /// Current session state, including anything refreshed by the last login.
    fn session(&self) -> SessionData;

    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, RemoteError>;

    async fn login_with_facebook(&self, access_token: &str) -> Result<LoginOutcome, RemoteError>;

    async fn logout(&self) -> Result<(), RemoteError>;

    async fn fetch_current_user(&self) -> Result<BaseUser, RemoteError>;

    /// Full story tray, in tray order.
    async fn fetch_reel_tray(&self) -> Result<Vec<Reel>, RemoteError>;

    /// Most recent `max_pages` pages of one thread.
    async fn fetch_thread_page(&self, thread_id: &str, max_pages: u32) -> Result<Thread, RemoteError>;

    /// One inbox page; `None` fetches the newest page.
    async fn fetch_inbox_page(&self, cursor: Option<&str>) -> Result<InboxPage, RemoteError>;

    async fn fetch_presence(&self) -> Result<HashMap<UserId, PresenceValue>, RemoteError>;

    async fn create_group_thread(&self, user_ids: &[UserId]) -> Result<Thread, RemoteError>;

    /// Look up the thread whose participants are exactly `user_ids`.
    ///
    /// A thread with no users in the response means "no such thread yet".
    async fn find_thread_by_participants(&self, user_ids: &[UserId]) -> Result<Thread, RemoteError>;

    async fn search_recipients(
        &self,
        query: &str,
        include_threads: bool,
    ) -> Result<RecipientSearchResult, RemoteError>;

    async fn mark_item_seen(&self, thread_id: &str, item_id: &str) -> Result<(), RemoteError>;

    /// Reply to a story by sharing it into `thread_id` with `text`.
    async fn send_reel_share(
        &self,
        owner_id: UserId,
        media_id: &str,
        thread_id: &str,
        text: &str,
    ) -> Result<(), RemoteError>;

    /// Start the push notification channel.
    async fn start_push(&self) -> Result<(), RemoteError>;
}

/// Builds a [`RemoteClient`] sharing the given session.
pub trait RemoteClientFactory: Send + Sync {
    fn create(&self, session: SessionData) -> Arc<dyn RemoteClient>;
}

/// Swappable slot holding the current remote client.
///
/// Engines keep a clone and look the client up on every call, so logout can
/// replace the client without rebuilding them.
#[derive(Clone, Default)]
pub struct SharedRemote {
    slot: Arc<RwLock<Option<Arc<dyn RemoteClient>>>>,
}

impl SharedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Arc<dyn RemoteClient>) -> Self {
        let shared = Self::new();
        shared.replace(client);
        shared
    }

    pub fn current(&self) -> Option<Arc<dyn RemoteClient>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install `client`, returning the one it replaced.
    pub fn replace(&self, client: Arc<dyn RemoteClient>) -> Option<Arc<dyn RemoteClient>> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(client)
    }

    pub fn is_installed(&self) -> bool {
        self.current().is_some()
    }

    /// The current client, or `NotInitialized`.
    pub fn require(&self) -> InboxResult<Arc<dyn RemoteClient>> {
        self.current().ok_or(InboxError::NotInitialized)
    }

    /// The current client if it holds a logged-in session.
    pub fn require_authenticated(&self, operation: &'static str) -> InboxResult<Arc<dyn RemoteClient>> {
        let client = self.require()?;
        if client.is_authenticated() {
            Ok(client)
        } else {
            Err(InboxError::AuthenticationRequired { operation })
        }
    }
}

impl std::fmt::Debug for SharedRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRemote")
            .field("installed", &self.is_installed())
            .finish()
    }
}
