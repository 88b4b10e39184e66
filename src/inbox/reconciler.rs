//! Network side of the inbox: fetch, then mutate on the inbox context.

use tokio::sync::broadcast;

use super::state::InboxState;
use super::{InboxEvent, Pagination, Selection, ThreadWrapper};
use crate::collection::Handle;
use crate::config::SyncConfig;
use crate::dispatch::Dispatcher;
use crate::error::{ErrorContext, InboxResult, ResultExt};
use crate::models::{Thread, ThreadKey};
use crate::registry::UserRegistry;
use crate::traits::{RemoteClient, SharedRemote};

const EVENT_CAPACITY: usize = 128;

/// Owns the inbox thread collection and its selection cursor.
///
/// Clones share the same inbox.
#[derive(Clone)]
pub struct InboxReconciler {
    remote: SharedRemote,
    registry: UserRegistry,
    context: Dispatcher<InboxState>,
    events: broadcast::Sender<InboxEvent>,
    page_limit: u32,
}

impl InboxReconciler {
    /// Create the reconciler and its owning context. Must be called inside a tokio runtime.
    pub fn new(remote: SharedRemote, registry: UserRegistry, config: &SyncConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = InboxState::new(config.stale_selection, Some(events.clone()));
        Self {
            remote,
            registry,
            context: Dispatcher::spawn("inbox", state),
            events,
            page_limit: config.thread_page_limit,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InboxEvent> {
        self.events.subscribe()
    }

    fn ctx(operation: &str) -> ErrorContext {
        ErrorContext::new(operation).with_component("inbox")
    }

    fn wrap(&self, handle: Handle, key: ThreadKey) -> ThreadWrapper {
        ThreadWrapper::new(self.context.clone(), handle, key)
    }

    /// Re-fetch the loaded window of the inbox and reconcile it.
    ///
    /// Returns the number of observable changes.
    pub async fn update_inbox(&self) -> InboxResult<usize> {
        let remote = self.remote.require_authenticated("update_inbox")?;
        let pages = self
            .context
            .run(|state| state.pagination.pages_loaded.max(1))
            .await
            .context(Self::ctx("update_inbox"))?;

        let (threads, pagination) = self.fetch_window(remote.as_ref(), pages).await?;
        let fetched = threads.len();
        self.registry.record_threads(&threads);

        let changes = self
            .context
            .run(move |state| state.apply_snapshot(threads, pagination))
            .await
            .context(Self::ctx("update_inbox"))?;

        tracing::info!(pages, fetched, changes, "Inbox reconciled");
        Ok(changes)
    }

    /// Drop everything and load the newest page again.
    pub async fn clear_and_reload(&self) -> InboxResult<usize> {
        let cleared = self
            .context
            .run(|state| state.clear())
            .await
            .context(Self::ctx("clear_and_reload"))?;
        tracing::debug!(cleared, "Inbox cleared");
        self.update_inbox().await
    }

    /// Load the next older page and append its threads.
    ///
    /// Returns the number of observable changes; `0` when there is nothing older.
    pub async fn load_older(&self) -> InboxResult<usize> {
        let remote = self.remote.require_authenticated("load_older")?;
        let pagination = self.pagination().await?;
        let cursor = match (pagination.has_older, pagination.oldest_cursor) {
            (true, Some(cursor)) => cursor,
            _ => return Ok(0),
        };

        let page = remote
            .fetch_inbox_page(Some(&cursor))
            .await
            .with_context(|| Self::ctx("load_older"))?;
        self.registry.record_threads(&page.threads);

        let expected = cursor.clone();
        let applied = self
            .context
            .run(move |state| {
                state.append_page(&expected, page.threads, page.oldest_cursor, page.has_older)
            })
            .await
            .context(Self::ctx("load_older"))?;

        match applied {
            Some(changes) => {
                tracing::info!(cursor = %cursor, changes, "Older inbox page loaded");
                Ok(changes)
            }
            None => {
                tracing::debug!(cursor = %cursor, "Inbox moved on, dropping older page");
                Ok(0)
            }
        }
    }

    /// Fetch the most recent page of one thread and merge it on the thread's own context.
    pub async fn update_thread(&self, wrapper: &ThreadWrapper) -> InboxResult<bool> {
        let Some(thread_id) = wrapper.thread_id() else {
            return Ok(false);
        };
        let remote = self.remote.require_authenticated("update_thread")?;
        let fetched = remote
            .fetch_thread_page(thread_id, self.page_limit)
            .await
            .with_context(|| Self::ctx("update_thread").with_thread_id(thread_id))?;
        self.registry.record_threads([&fetched]);

        let changed = wrapper.update(fetched).await?;
        tracing::debug!(thread_id, changed, "Thread refreshed");
        Ok(changed)
    }

    /// Resolve a placeholder to its canonical thread and select it.
    ///
    /// Prefers the live inbox copy when one exists. Lookup failures are not
    /// errors; the placeholder itself is selected instead.
    pub async fn make_canonical(&self, placeholder: Thread) -> InboxResult<Thread> {
        let resolved = if !placeholder.is_placeholder() {
            placeholder
        } else {
            self.resolve_placeholder(placeholder).await?
        };

        self.context
            .run(move |state| match state.select_thread(resolved.clone()) {
                Selection::Attached(handle) => state.threads.get(handle).cloned().unwrap_or(resolved),
                _ => resolved,
            })
            .await
            .context(Self::ctx("make_canonical"))
    }

    async fn resolve_placeholder(&self, placeholder: Thread) -> InboxResult<Thread> {
        let remote = self.remote.require_authenticated("make_canonical")?;
        let ids = placeholder.participant_ids();

        match remote.find_thread_by_participants(&ids).await {
            Ok(found) if !found.users.is_empty() => {
                self.registry.record_threads([&found]);
                Ok(found)
            }
            Ok(_) => Ok(match placeholder.users.first() {
                Some(first) => Thread::direct_with(first.clone()),
                None => placeholder,
            }),
            Err(e) => {
                tracing::warn!(error = %e, participants = ?ids, "Thread lookup failed, keeping placeholder");
                Ok(placeholder)
            }
        }
    }

    /// Select `thread_id` once the inbox has loaded (immediately if it has).
    pub async fn open_thread_when_ready(&self, thread_id: &str) -> InboxResult<bool> {
        let thread_id = thread_id.to_string();
        self.context
            .run(move |state| state.open_when_ready(&thread_id))
            .await
            .context(Self::ctx("open_thread_when_ready"))
    }

    /// Select `thread`, attaching to the live copy when the inbox has one.
    pub async fn select(&self, thread: Thread) -> InboxResult<Selection> {
        self.context
            .run(move |state| state.select_thread(thread))
            .await
            .context(Self::ctx("select"))
    }

    pub async fn set_selected_thread_null(&self) -> InboxResult<()> {
        self.context
            .run(|state| state.set_selection(Selection::None))
            .await
            .context(Self::ctx("set_selected_thread_null"))
    }

    pub async fn selection(&self) -> InboxResult<Selection> {
        self.context
            .run(|state| state.selection.clone())
            .await
            .context(Self::ctx("selection"))
    }

    /// Current value of the selected thread, attached or not.
    pub async fn selected(&self) -> InboxResult<Option<Thread>> {
        self.context
            .run(|state| state.selected_thread())
            .await
            .context(Self::ctx("selected"))
    }

    /// Wrapper for the selected thread when it is part of the inbox.
    pub async fn selected_wrapper(&self) -> InboxResult<Option<ThreadWrapper>> {
        let found = self
            .context
            .run(|state| {
                let handle = state.selection.handle()?;
                state.threads.get(handle).map(|t| (handle, t.key()))
            })
            .await
            .context(Self::ctx("selected_wrapper"))?;
        Ok(found.map(|(handle, key)| self.wrap(handle, key)))
    }

    /// Wrappers for every inbox thread, in display order.
    pub async fn threads(&self) -> InboxResult<Vec<ThreadWrapper>> {
        let entries = self
            .context
            .run(|state| {
                state
                    .threads
                    .iter()
                    .map(|(handle, t)| (handle, t.key()))
                    .collect::<Vec<_>>()
            })
            .await
            .context(Self::ctx("threads"))?;
        Ok(entries
            .into_iter()
            .map(|(handle, key)| self.wrap(handle, key))
            .collect())
    }

    /// Owned copy of the inbox, in display order.
    pub async fn snapshot(&self) -> InboxResult<Vec<(Handle, Thread)>> {
        self.context
            .run(|state| state.threads.snapshot())
            .await
            .context(Self::ctx("snapshot"))
    }

    pub async fn find(&self, key: ThreadKey) -> InboxResult<Option<ThreadWrapper>> {
        let lookup = key.clone();
        let handle = self
            .context
            .run(move |state| state.threads.find(&lookup))
            .await
            .context(Self::ctx("find"))?;
        Ok(handle.map(|handle| self.wrap(handle, key)))
    }

    pub async fn pagination(&self) -> InboxResult<Pagination> {
        self.context
            .run(|state| state.pagination.clone())
            .await
            .context(Self::ctx("pagination"))
    }

    pub async fn is_first_updated(&self) -> InboxResult<bool> {
        self.context
            .run(|state| state.is_first_updated())
            .await
            .context(Self::ctx("is_first_updated"))
    }

    /// Fetch the newest page plus `pages - 1` older ones, following cursors.
    async fn fetch_window(
        &self,
        remote: &dyn RemoteClient,
        pages: usize,
    ) -> InboxResult<(Vec<Thread>, Pagination)> {
        let mut threads = Vec::new();
        let mut pagination = Pagination::default();
        let mut cursor: Option<String> = None;

        loop {
            let page = remote
                .fetch_inbox_page(cursor.as_deref())
                .await
                .with_context(|| Self::ctx("fetch_inbox_page"))?;

            if pagination.pages_loaded == 0 {
                pagination.unseen_count = page.unseen_count;
            }
            pagination.pages_loaded += 1;
            pagination.has_older = page.has_older;
            pagination.oldest_cursor = page.oldest_cursor;
            threads.extend(page.threads);

            if pagination.pages_loaded >= pages || !pagination.has_older {
                break;
            }
            match &pagination.oldest_cursor {
                Some(next) if cursor.as_ref() != Some(next) => cursor = Some(next.clone()),
                _ => break,
            }
        }

        Ok((threads, pagination))
    }
}

impl std::fmt::Debug for InboxReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboxReconciler")
            .field("context", &self.context)
            .field("page_limit", &self.page_limit)
            .finish()
    }
}
