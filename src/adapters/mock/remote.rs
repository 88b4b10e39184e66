//! Scriptable remote client for testing.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::lock;
use crate::error::RemoteError;
use crate::models::{
    BaseUser, InboxPage, LoginOutcome, PresenceValue, RecipientSearchResult, Reel, SessionData,
    Thread, UserId,
};
use crate::traits::{RemoteClient, RemoteClientFactory};

/// A recorded call for verification in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Login { username: String },
    LoginWithFacebook,
    Logout,
    FetchCurrentUser,
    FetchReelTray,
    FetchThreadPage { thread_id: String, max_pages: u32 },
    FetchInboxPage { cursor: Option<String> },
    FetchPresence,
    CreateGroupThread { user_ids: Vec<UserId> },
    FindThreadByParticipants { user_ids: Vec<UserId> },
    SearchRecipients { query: String, include_threads: bool },
    MarkItemSeen { thread_id: String, item_id: String },
    SendReelShare {
        owner_id: UserId,
        media_id: String,
        thread_id: String,
        text: String,
    },
    StartPush,
}

impl RemoteCall {
    /// Name of the trait method, as used by [`MockRemoteClient::set_should_fail`].
    pub fn method(&self) -> &'static str {
        match self {
            RemoteCall::Login { .. } => "login",
            RemoteCall::LoginWithFacebook => "login_with_facebook",
            RemoteCall::Logout => "logout",
            RemoteCall::FetchCurrentUser => "fetch_current_user",
            RemoteCall::FetchReelTray => "fetch_reel_tray",
            RemoteCall::FetchThreadPage { .. } => "fetch_thread_page",
            RemoteCall::FetchInboxPage { .. } => "fetch_inbox_page",
            RemoteCall::FetchPresence => "fetch_presence",
            RemoteCall::CreateGroupThread { .. } => "create_group_thread",
            RemoteCall::FindThreadByParticipants { .. } => "find_thread_by_participants",
            RemoteCall::SearchRecipients { .. } => "search_recipients",
            RemoteCall::MarkItemSeen { .. } => "mark_item_seen",
            RemoteCall::SendReelShare { .. } => "send_reel_share",
            RemoteCall::StartPush => "start_push",
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    session: SessionData,
    login_outcome: Option<LoginOutcome>,
    current_user: Option<BaseUser>,
    reel_tray: Vec<Reel>,
    inbox_pages: HashMap<Option<String>, InboxPage>,
    threads: HashMap<String, Thread>,
    presence: HashMap<UserId, PresenceValue>,
    by_participants: HashMap<Vec<UserId>, Thread>,
    created_thread: Option<Thread>,
    search_result: RecipientSearchResult,
    failing: HashSet<&'static str>,
    delay: Option<Duration>,
    calls: Vec<RemoteCall>,
}

/// Mock remote client.
///
/// Responses are scripted with the `set_*` methods; every call is recorded and
/// can be made to fail or to take simulated time (`tokio::time::sleep`, so it
/// honours paused test time).
///
/// ```ignore
/// let remote = MockRemoteClient::authenticated(BaseUser::new(1, "me"));
/// remote.set_reel_tray(vec![reel("a")]);
/// remote.set_should_fail("fetch_presence", true);
///
/// engine.refresh().await;
/// assert_eq!(remote.call_count("fetch_reel_tray"), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockRemoteClient {
    state: Arc<Mutex<MockState>>,
}

impl MockRemoteClient {
    /// Unauthenticated client with no scripted data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client whose session is already logged in as `user`.
    pub fn authenticated(user: BaseUser) -> Self {
        let client = Self::new();
        client.sign_in(user);
        client
    }

    pub fn set_session(&self, session: SessionData) {
        lock(&self.state).session = session;
    }

    pub fn sign_in(&self, user: BaseUser) {
        let mut state = lock(&self.state);
        state.session.auth_token = Some("mock-token".to_string());
        state.session.logged_in_user = Some(user.clone());
        state.current_user = Some(user);
    }

    /// Outcome returned by both login calls. `LoggedIn` also signs the session in.
    pub fn set_login_outcome(&self, outcome: LoginOutcome) {
        lock(&self.state).login_outcome = Some(outcome);
    }

    pub fn set_current_user(&self, user: BaseUser) {
        lock(&self.state).current_user = Some(user);
    }

    pub fn set_reel_tray(&self, reels: Vec<Reel>) {
        lock(&self.state).reel_tray = reels;
    }

    /// Script the inbox page returned for `cursor` (`None` = newest page).
    pub fn set_inbox_page(&self, cursor: Option<&str>, page: InboxPage) {
        lock(&self.state)
            .inbox_pages
            .insert(cursor.map(str::to_string), page);
    }

    pub fn set_thread(&self, thread: Thread) {
        lock(&self.state)
            .threads
            .insert(thread.thread_id.clone(), thread);
    }

    pub fn set_presence(&self, presence: HashMap<UserId, PresenceValue>) {
        lock(&self.state).presence = presence;
    }

    /// Thread returned by `find_thread_by_participants` for this participant set.
    pub fn set_thread_for_participants(&self, user_ids: &[UserId], thread: Thread) {
        lock(&self.state)
            .by_participants
            .insert(normalise(user_ids), thread);
    }

    pub fn set_created_thread(&self, thread: Thread) {
        lock(&self.state).created_thread = Some(thread);
    }

    pub fn set_search_result(&self, result: RecipientSearchResult) {
        lock(&self.state).search_result = result;
    }

    /// Make calls to `method` (a trait method name) fail with a network error.
    pub fn set_should_fail(&self, method: &'static str, should_fail: bool) {
        let mut state = lock(&self.state);
        if should_fail {
            state.failing.insert(method);
        } else {
            state.failing.remove(method);
        }
    }

    /// Simulated latency applied to every call.
    pub fn set_delay(&self, delay: Option<Duration>) {
        lock(&self.state).delay = delay;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        lock(&self.state).calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| call.method() == method)
            .count()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    async fn enter(&self, call: RemoteCall) -> Result<(), RemoteError> {
        let method = call.method();
        let (delay, fails) = {
            let mut state = lock(&self.state);
            state.calls.push(call);
            (state.delay, state.failing.contains(method))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fails {
            return Err(RemoteError::Network(format!("mock {} failure", method)));
        }
        Ok(())
    }

    fn ensure_authenticated(&self) -> Result<(), RemoteError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(RemoteError::NotAuthenticated)
        }
    }

    fn apply_login(&self) -> LoginOutcome {
        let mut state = lock(&self.state);
        let outcome = state.login_outcome.clone().unwrap_or(LoginOutcome::BadPassword);
        if let LoginOutcome::LoggedIn { user } = &outcome {
            state.session.auth_token = Some("mock-token".to_string());
            state.session.logged_in_user = Some(user.clone());
            state.current_user.get_or_insert_with(|| user.clone());
        }
        outcome
    }
}

fn normalise(user_ids: &[UserId]) -> Vec<UserId> {
    let mut ids = user_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[async_trait]
impl RemoteClient for MockRemoteClient {
    fn is_authenticated(&self) -> bool {
        lock(&self.state).session.is_authenticated()
    }

    fn session(&self) -> SessionData {
        lock(&self.state).session.clone()
    }

    async fn login(&self, username: &str, _password: &str) -> Result<LoginOutcome, RemoteError> {
        self.enter(RemoteCall::Login {
            username: username.to_string(),
        })
        .await?;
        Ok(self.apply_login())
    }

    async fn login_with_facebook(&self, _access_token: &str) -> Result<LoginOutcome, RemoteError> {
        self.enter(RemoteCall::LoginWithFacebook).await?;
        Ok(self.apply_login())
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        self.enter(RemoteCall::Logout).await?;
        lock(&self.state).session.invalidate();
        Ok(())
    }

    async fn fetch_current_user(&self) -> Result<BaseUser, RemoteError> {
        self.enter(RemoteCall::FetchCurrentUser).await?;
        self.ensure_authenticated()?;
        lock(&self.state)
            .current_user
            .clone()
            .ok_or_else(|| RemoteError::InvalidResponse("no current user scripted".to_string()))
    }

    async fn fetch_reel_tray(&self) -> Result<Vec<Reel>, RemoteError> {
        self.enter(RemoteCall::FetchReelTray).await?;
        self.ensure_authenticated()?;
        Ok(lock(&self.state).reel_tray.clone())
    }

    async fn fetch_thread_page(&self, thread_id: &str, max_pages: u32) -> Result<Thread, RemoteError> {
        self.enter(RemoteCall::FetchThreadPage {
            thread_id: thread_id.to_string(),
            max_pages,
        })
        .await?;
        self.ensure_authenticated()?;
        lock(&self.state)
            .threads
            .get(thread_id)
            .cloned()
            .ok_or_else(|| RemoteError::Status {
                status: 404,
                message: format!("thread {} not scripted", thread_id),
            })
    }

    async fn fetch_inbox_page(&self, cursor: Option<&str>) -> Result<InboxPage, RemoteError> {
        self.enter(RemoteCall::FetchInboxPage {
            cursor: cursor.map(str::to_string),
        })
        .await?;
        self.ensure_authenticated()?;
        Ok(lock(&self.state)
            .inbox_pages
            .get(&cursor.map(str::to_string))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_presence(&self) -> Result<HashMap<UserId, PresenceValue>, RemoteError> {
        self.enter(RemoteCall::FetchPresence).await?;
        self.ensure_authenticated()?;
        Ok(lock(&self.state).presence.clone())
    }

    async fn create_group_thread(&self, user_ids: &[UserId]) -> Result<Thread, RemoteError> {
        self.enter(RemoteCall::CreateGroupThread {
            user_ids: user_ids.to_vec(),
        })
        .await?;
        self.ensure_authenticated()?;
        lock(&self.state)
            .created_thread
            .clone()
            .ok_or_else(|| RemoteError::InvalidResponse("no created thread scripted".to_string()))
    }

    async fn find_thread_by_participants(&self, user_ids: &[UserId]) -> Result<Thread, RemoteError> {
        self.enter(RemoteCall::FindThreadByParticipants {
            user_ids: user_ids.to_vec(),
        })
        .await?;
        self.ensure_authenticated()?;
        Ok(lock(&self.state)
            .by_participants
            .get(&normalise(user_ids))
            .cloned()
            .unwrap_or_default())
    }

    async fn search_recipients(
        &self,
        query: &str,
        include_threads: bool,
    ) -> Result<RecipientSearchResult, RemoteError> {
        self.enter(RemoteCall::SearchRecipients {
            query: query.to_string(),
            include_threads,
        })
        .await?;
        self.ensure_authenticated()?;
        let mut result = lock(&self.state).search_result.clone();
        if !include_threads {
            result.threads.clear();
        }
        Ok(result)
    }

    async fn mark_item_seen(&self, thread_id: &str, item_id: &str) -> Result<(), RemoteError> {
        self.enter(RemoteCall::MarkItemSeen {
            thread_id: thread_id.to_string(),
            item_id: item_id.to_string(),
        })
        .await?;
        self.ensure_authenticated()
    }

    async fn send_reel_share(
        &self,
        owner_id: UserId,
        media_id: &str,
        thread_id: &str,
        text: &str,
    ) -> Result<(), RemoteError> {
        self.enter(RemoteCall::SendReelShare {
            owner_id,
            media_id: media_id.to_string(),
            thread_id: thread_id.to_string(),
            text: text.to_string(),
        })
        .await?;
        self.ensure_authenticated()
    }

    async fn start_push(&self) -> Result<(), RemoteError> {
        self.enter(RemoteCall::StartPush).await
    }
}

/// Factory handing out clients that share one [`MockRemoteClient`].
///
/// `create` installs the given session on the shared client, so tests can
/// observe a logout replacing the client with an unauthenticated one.
#[derive(Debug, Clone)]
pub struct MockRemoteFactory {
    client: MockRemoteClient,
    created: Arc<Mutex<Vec<SessionData>>>,
}

impl MockRemoteFactory {
    pub fn new(client: MockRemoteClient) -> Self {
        Self {
            client,
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn client(&self) -> &MockRemoteClient {
        &self.client
    }

    /// Sessions passed to `create`, oldest first.
    pub fn created_sessions(&self) -> Vec<SessionData> {
        lock(&self.created).clone()
    }
}

impl RemoteClientFactory for MockRemoteFactory {
    fn create(&self, session: SessionData) -> Arc<dyn RemoteClient> {
        lock(&self.created).push(session.clone());
        self.client.set_session(session);
        Arc::new(self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unauthenticated_calls_fail() {
        let remote = MockRemoteClient::new();
        assert_eq!(
            remote.fetch_reel_tray().await.unwrap_err(),
            RemoteError::NotAuthenticated
        );
        assert_eq!(remote.call_count("fetch_reel_tray"), 1);
    }

    #[tokio::test]
    async fn test_failure_switch() {
        let remote = MockRemoteClient::authenticated(BaseUser::new(1, "me"));
        remote.set_should_fail("fetch_presence", true);
        assert!(matches!(
            remote.fetch_presence().await,
            Err(RemoteError::Network(_))
        ));
        remote.set_should_fail("fetch_presence", false);
        assert!(remote.fetch_presence().await.is_ok());
    }

    #[tokio::test]
    async fn test_login_outcome_signs_in() {
        let remote = MockRemoteClient::new();
        assert_eq!(
            remote.login("me", "pw").await.unwrap(),
            LoginOutcome::BadPassword
        );
        assert!(!remote.is_authenticated());

        remote.set_login_outcome(LoginOutcome::LoggedIn {
            user: BaseUser::new(1, "me"),
        });
        assert!(remote.login("me", "pw").await.unwrap().is_logged_in());
        assert!(remote.is_authenticated());
    }

    #[tokio::test]
    async fn test_participants_lookup_is_order_insensitive() {
        let remote = MockRemoteClient::authenticated(BaseUser::new(1, "me"));
        remote.set_thread_for_participants(&[3, 2], Thread::new("t", vec![BaseUser::new(2, "a")]));
        let found = remote.find_thread_by_participants(&[2, 3]).await.unwrap();
        assert_eq!(found.thread_id, "t");
    }

    #[test]
    fn test_factory_installs_session() {
        let client = MockRemoteClient::authenticated(BaseUser::new(1, "me"));
        let factory = MockRemoteFactory::new(client.clone());

        let mut session = client.session();
        session.invalidate();
        let created = factory.create(session);

        assert!(!created.is_authenticated());
        assert!(!client.is_authenticated());
        assert_eq!(factory.created_sessions().len(), 1);
    }
}
