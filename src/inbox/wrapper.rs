//! Presentation handle for one thread.

use std::hash::{Hash, Hasher};

use super::state::InboxState;
use crate::collection::Handle;
use crate::dispatch::{ContextId, Dispatcher};
use crate::error::{ErrorContext, InboxResult, ResultExt};
use crate::models::{Thread, ThreadKey};
use crate::traits::RemoteClient;

/// A thread together with the context that owns it.
///
/// Every mutation is marshalled onto the owning context, which is the primary
/// inbox for inbox threads and a private context for threads opened in a
/// secondary view. Two wrappers are equal when they refer to the same thread
/// identity, whichever context they live on.
#[derive(Clone)]
pub struct ThreadWrapper {
    context: Dispatcher<InboxState>,
    handle: Handle,
    key: ThreadKey,
}

impl ThreadWrapper {
    pub(crate) fn new(context: Dispatcher<InboxState>, handle: Handle, key: ThreadKey) -> Self {
        Self {
            context,
            handle,
            key,
        }
    }

    /// Spawn a private context holding `thread` and wrap it.
    pub(crate) fn spawn_secondary(thread: Thread) -> Self {
        let key = thread.key();
        let name = match &key {
            ThreadKey::Id(id) => format!("secondary:{}", id),
            ThreadKey::Participants(ids) => format!("secondary:placeholder:{:?}", ids),
        };
        let (state, handle) = InboxState::secondary(thread);
        Self::new(Dispatcher::spawn(name, state), handle, key)
    }

    pub fn key(&self) -> &ThreadKey {
        &self.key
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn context_id(&self) -> ContextId {
        self.context.id()
    }

    /// Server id, or `None` for a placeholder.
    pub fn thread_id(&self) -> Option<&str> {
        match &self.key {
            ThreadKey::Id(id) => Some(id),
            ThreadKey::Participants(_) => None,
        }
    }

    /// Whether both wrappers point into the same context.
    pub fn shares_context(&self, other: &ThreadWrapper) -> bool {
        self.context.id() == other.context.id()
    }

    /// Current value of the thread; `None` once it left its collection.
    pub async fn snapshot(&self) -> InboxResult<Option<Thread>> {
        let handle = self.handle;
        self.context
            .run(move |state| state.threads.get(handle).cloned())
            .await
            .with_context(|| self.error_context("snapshot"))
    }

    /// Merge a fetched copy of the thread in place on the owning context.
    ///
    /// Returns whether anything changed. A thread that left its collection is
    /// not an error; the update is dropped.
    pub async fn update(&self, fetched: Thread) -> InboxResult<bool> {
        let handle = self.handle;
        let applied = self
            .context
            .run(move |state| state.update_thread(handle, &fetched))
            .await
            .with_context(|| self.error_context("update_thread"))?;

        match applied {
            Some(changed) => Ok(changed),
            None => {
                tracing::debug!(key = ?self.key, "Thread left its collection, dropping update");
                Ok(false)
            }
        }
    }

    /// Tell the server the newest item was seen and record it locally.
    pub async fn mark_latest_item_seen(&self, remote: &dyn RemoteClient) -> InboxResult<bool> {
        let Some(thread_id) = self.thread_id() else {
            return Ok(false);
        };
        let Some(thread) = self.snapshot().await? else {
            return Ok(false);
        };
        if thread.is_latest_item_seen() {
            return Ok(false);
        }
        let Some(item_id) = thread.latest_item().map(|item| item.item_id.clone()) else {
            return Ok(false);
        };

        remote
            .mark_item_seen(thread_id, &item_id)
            .await
            .with_context(|| self.error_context("mark_item_seen"))?;

        let handle = self.handle;
        let marked = item_id.clone();
        self.context
            .run(move |state| state.mark_seen(handle, &marked))
            .await
            .with_context(|| self.error_context("mark_item_seen"))?;

        tracing::debug!(thread_id, item_id = %item_id, "Marked latest item seen");
        Ok(true)
    }

    /// Copy the thread onto a fresh context for an independent view.
    pub async fn clone_for_secondary_view(&self) -> InboxResult<ThreadWrapper> {
        let thread = self.snapshot().await?.ok_or_else(|| {
            crate::error::InboxError::unexpected("thread is no longer available")
                .with_context(self.error_context("clone_for_secondary_view"))
        })?;
        Ok(Self::spawn_secondary(thread))
    }

    /// Shut down the owning context if it is a secondary view.
    pub fn close(&self) {
        if self.context.name().starts_with("secondary:") {
            self.context.shutdown();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.context.is_closed()
    }

    fn error_context(&self, operation: &str) -> ErrorContext {
        let ctx = ErrorContext::new(operation).with_component(self.context.name());
        match self.thread_id() {
            Some(id) => ctx.with_thread_id(id),
            None => ctx,
        }
    }
}

impl PartialEq for ThreadWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ThreadWrapper {}

impl Hash for ThreadWrapper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl std::fmt::Debug for ThreadWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadWrapper")
            .field("key", &self.key)
            .field("handle", &self.handle)
            .field("context", &self.context.name())
            .finish()
    }
}
