use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{DEFAULT_FAULT_MESSAGE, SESSION_KEY, THREAD_INFO_KEY};
use crate::config::SyncConfig;
use crate::debouncer::Debouncer;
use crate::error::{ErrorContext, InboxError, InboxResult, ResultExt};
use crate::inbox::{InboxReconciler, Selection, ThreadWrapper};
use crate::models::{BaseUser, LoginOutcome, SessionData, Thread, ThreadInfo, ThreadInfoMap, UserId};
use crate::presence::PresenceTracker;
use crate::reels::ReelSyncEngine;
use crate::registry::UserRegistry;
use crate::traits::{Cache, CacheExt, FaultAction, FaultReporter, RemoteClientFactory, SharedRemote};

/// Top-level glue between the engines, the remote client and persistence.
///
/// The remote client is created lazily by [`initialize`](Self::initialize)
/// and replaced on [`logout`](Self::logout); every engine reads it through the
/// same [`SharedRemote`] slot.
pub struct SessionOrchestrator {
    pub(super) config: SyncConfig,
    factory: Arc<dyn RemoteClientFactory>,
    cache: Arc<dyn Cache>,
    faults: Arc<dyn FaultReporter>,
    pub(super) remote: SharedRemote,
    pub(super) registry: UserRegistry,
    pub(super) debouncer: Debouncer,
    inbox: InboxReconciler,
    reels: ReelSyncEngine,
    presence: PresenceTracker,
    thread_info: Mutex<ThreadInfoMap>,
    secondary_threads: Mutex<Vec<ThreadWrapper>>,
    init: tokio::sync::Mutex<()>,
}

impl SessionOrchestrator {
    /// Build the orchestrator and its engines. Must be called inside a tokio runtime.
    pub fn new(
        config: SyncConfig,
        factory: Arc<dyn RemoteClientFactory>,
        cache: Arc<dyn Cache>,
        faults: Arc<dyn FaultReporter>,
    ) -> Self {
        let remote = SharedRemote::new();
        let registry = UserRegistry::new();
        let inbox = InboxReconciler::new(remote.clone(), registry.clone(), &config);
        let reels = ReelSyncEngine::new(remote.clone(), registry.clone(), &config);
        let presence = PresenceTracker::new(remote.clone());

        Self {
            config,
            factory,
            cache,
            faults,
            remote,
            registry,
            debouncer: Debouncer::new(),
            inbox,
            reels,
            presence,
            thread_info: Mutex::new(ThreadInfoMap::new()),
            secondary_threads: Mutex::new(Vec::new()),
            init: tokio::sync::Mutex::new(()),
        }
    }

    fn ctx(operation: &str) -> ErrorContext {
        ErrorContext::new(operation).with_component("session")
    }

    fn thread_info_map(&self) -> MutexGuard<'_, ThreadInfoMap> {
        self.thread_info.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn secondary(&self) -> MutexGuard<'_, Vec<ThreadWrapper>> {
        self.secondary_threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Load the last session and thread metadata and create the remote client.
    ///
    /// Returns `false` without doing anything once a client exists. Unreadable
    /// cache entries are logged and replaced by fresh state.
    pub async fn initialize(&self) -> InboxResult<bool> {
        let _guard = self.init.lock().await;
        if self.remote.is_installed() {
            tracing::debug!("Session already initialized");
            return Ok(false);
        }

        let stored: Result<Option<SessionData>, _> = self.cache.read(SESSION_KEY).await;
        let session = match stored {
            Ok(Some(session)) => session,
            Ok(None) => SessionData::new(),
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "Stored session unreadable, starting fresh");
                SessionData::new()
            }
        };

        let stored: Result<Option<ThreadInfoMap>, _> = self.cache.read(THREAD_INFO_KEY).await;
        let info = match stored {
            Ok(info) => info.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "Stored thread info unreadable, starting empty");
                ThreadInfoMap::new()
            }
        };
        let threads_known = info.len();
        *self.thread_info_map() = info;

        if let Some(user) = &session.logged_in_user {
            self.registry.record(user);
        }
        let authenticated = session.is_authenticated();
        self.remote.replace(self.factory.create(session));

        tracing::info!(authenticated, threads_known, "Session initialized");
        Ok(true)
    }

    pub async fn login(&self, username: &str, password: &str) -> InboxResult<LoginOutcome> {
        let remote = self.remote.require()?;
        let outcome = remote
            .login(username, password)
            .await
            .with_context(|| Self::ctx("login"))?;
        self.after_login(&outcome);
        Ok(outcome)
    }

    pub async fn login_with_facebook(&self, access_token: &str) -> InboxResult<LoginOutcome> {
        let remote = self.remote.require()?;
        let outcome = remote
            .login_with_facebook(access_token)
            .await
            .with_context(|| Self::ctx("login_with_facebook"))?;
        self.after_login(&outcome);
        Ok(outcome)
    }

    fn after_login(&self, outcome: &LoginOutcome) {
        match outcome {
            LoginOutcome::LoggedIn { user } => {
                self.registry.record(user);
                tracing::info!(user = %user.username, "Logged in");
            }
            other => tracing::info!(outcome = ?other, "Login not completed"),
        }
    }

    /// Bring every engine up after a successful login.
    ///
    /// Only the authentication precondition is an error. Inbox, presence,
    /// reel and push failures are logged; the next refresh cycle recovers.
    pub async fn on_logged_in(&self) -> InboxResult<()> {
        let remote = self.remote.require_authenticated("on_logged_in")?;

        if let Err(e) = self.inbox.clear_and_reload().await {
            tracing::warn!(error = %e, code = e.error_code(), "Initial inbox load failed");
        }
        self.presence.refresh().await;
        let outcome = self.reels.refresh().await;
        tracing::debug!(?outcome, "Initial reel refresh");
        self.reels.start_loop();

        if let Err(e) = remote.start_push().await {
            tracing::warn!(error = %e, code = e.error_code(), "Push channel failed to start");
        }
        Ok(())
    }

    /// Stop background work, end the remote session and forget per-thread metadata.
    ///
    /// The replacement client keeps the device identity of the old session.
    pub async fn logout(&self) -> InboxResult<()> {
        let remote = self.remote.require()?;
        self.reels.stop();

        if let Err(e) = remote.logout().await {
            tracing::warn!(error = %e, code = e.error_code(), "Remote logout failed, dropping session locally");
        }
        let mut session = remote.session();
        session.invalidate();

        self.thread_info_map().clear();
        if let Err(e) = self.cache.remove(THREAD_INFO_KEY).await {
            tracing::warn!(error = %e, code = e.error_code(), "Failed to remove stored thread info");
        }

        self.remote.replace(self.factory.create(session));
        tracing::info!("Logged out");
        Ok(())
    }

    /// Persist the session and per-thread metadata.
    pub async fn save_state(&self) -> InboxResult<()> {
        let remote = self.remote.require()?;
        self.cache
            .write(SESSION_KEY, &remote.session())
            .await
            .context(Self::ctx("save_state"))?;

        let info = self.thread_info_map().clone();
        self.cache
            .write(THREAD_INFO_KEY, &info)
            .await
            .context(Self::ctx("save_state"))?;

        tracing::debug!(threads = info.len(), "Session state saved");
        Ok(())
    }

    /// Re-fetch the logged-in user's profile.
    pub async fn update_logged_in_user(&self) -> InboxResult<BaseUser> {
        let remote = self.remote.require_authenticated("update_logged_in_user")?;
        let user = remote
            .fetch_current_user()
            .await
            .with_context(|| Self::ctx("update_logged_in_user"))?;
        self.registry.record(&user);
        Ok(user)
    }

    /// Refresh the inbox, then the selected thread.
    ///
    /// An attached selection is re-fetched and marked seen. A detached one is
    /// re-attached when the refreshed inbox now holds a thread with its id.
    pub async fn update_inbox_and_selected_thread(&self) -> InboxResult<()> {
        self.inbox.update_inbox().await?;

        match self.inbox.selection().await? {
            Selection::None => {}
            Selection::Attached(_) => {
                if let Some(wrapper) = self.inbox.selected_wrapper().await? {
                    self.inbox.update_thread(&wrapper).await?;
                    let remote = self.remote.require_authenticated("mark_item_seen")?;
                    wrapper.mark_latest_item_seen(remote.as_ref()).await?;
                }
            }
            Selection::Detached(thread) => {
                if !thread.is_placeholder() {
                    self.inbox.select(thread).await?;
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Threads
    // ========================================================================

    /// Copy `wrapper`'s thread onto a new context for an independent view.
    pub async fn open_thread_in_new_window(&self, wrapper: &ThreadWrapper) -> InboxResult<ThreadWrapper> {
        let secondary = wrapper.clone_for_secondary_view().await?;
        tracing::info!(
            key = ?secondary.key(),
            context = %secondary.context_id(),
            "Opened thread in secondary view"
        );
        self.secondary().push(secondary.clone());
        Ok(secondary)
    }

    /// Close a secondary view and forget it. Returns whether it was open.
    pub fn close_secondary_view(&self, wrapper: &ThreadWrapper) -> bool {
        let mut secondary = self.secondary();
        let Some(index) = secondary.iter().position(|w| w.shares_context(wrapper)) else {
            return false;
        };
        secondary.remove(index).close();
        true
    }

    pub fn secondary_threads(&self) -> Vec<ThreadWrapper> {
        self.secondary().clone()
    }

    /// Create a thread with `user_ids` and select it, preferring the inbox copy.
    pub async fn create_and_open_thread(&self, user_ids: &[UserId]) -> InboxResult<Thread> {
        let remote = self.remote.require_authenticated("create_and_open_thread")?;
        let thread = remote
            .create_group_thread(user_ids)
            .await
            .with_context(|| Self::ctx("create_and_open_thread"))?;
        self.registry.record_threads([&thread]);

        let selection = self.inbox.select(thread.clone()).await?;
        tracing::info!(
            thread_id = %thread.thread_id,
            in_inbox = selection.handle().is_some(),
            "Thread created and opened"
        );
        Ok(thread)
    }

    /// Look up the thread with `user_ids` and hold it on a new secondary context.
    pub async fn fetch_thread(&self, user_ids: &[UserId]) -> InboxResult<ThreadWrapper> {
        let remote = self.remote.require_authenticated("fetch_thread")?;
        let thread = remote
            .find_thread_by_participants(user_ids)
            .await
            .with_context(|| Self::ctx("fetch_thread"))?;
        self.registry.record_threads([&thread]);
        Ok(ThreadWrapper::spawn_secondary(thread))
    }

    /// Turn a placeholder (from search, say) into the canonical thread and select it.
    pub async fn make_proper_inbox_thread(&self, placeholder: Thread) -> InboxResult<Thread> {
        self.inbox.make_canonical(placeholder).await
    }

    // ========================================================================
    // Thread metadata
    // ========================================================================

    pub fn thread_info(&self, thread_id: &str) -> Option<ThreadInfo> {
        self.thread_info_map().get(thread_id).cloned()
    }

    pub fn set_thread_info(&self, thread_id: impl Into<String>, info: ThreadInfo) {
        self.thread_info_map().insert(thread_id.into(), info);
    }

    // ========================================================================
    // Faults
    // ========================================================================

    /// Log `error` and surface it to the user, who may choose to terminate.
    pub async fn report_fault(&self, message: Option<&str>, error: &InboxError) -> FaultAction {
        tracing::error!(
            error = %error,
            code = error.error_code(),
            category = %error.category(),
            context = ?error.context(),
            "Unexpected fault"
        );
        let message = message.unwrap_or(DEFAULT_FAULT_MESSAGE);
        let action = self.faults.report(message).await;
        if action == FaultAction::Terminate {
            tracing::error!("Fault acknowledged, termination requested");
        }
        action
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn remote(&self) -> &SharedRemote {
        &self.remote
    }

    pub fn inbox(&self) -> &InboxReconciler {
        &self.inbox
    }

    pub fn reels(&self) -> &ReelSyncEngine {
        &self.reels
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn registry(&self) -> &UserRegistry {
        &self.registry
    }

    pub fn is_authenticated(&self) -> bool {
        self.remote
            .current()
            .is_some_and(|remote| remote.is_authenticated())
    }

    pub fn logged_in_user(&self) -> Option<BaseUser> {
        self.remote
            .current()
            .and_then(|remote| remote.session().logged_in_user)
    }
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("remote", &self.remote)
            .field("inbox", &self.inbox)
            .field("reels", &self.reels)
            .field("secondary_threads", &self.secondary().len())
            .finish()
    }
}
