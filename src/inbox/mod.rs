//! Inbox thread collection, selection cursor and paging.
//!
//! The thread collection lives in an [`InboxState`] owned by one
//! [`Dispatcher`](crate::dispatch::Dispatcher). [`InboxReconciler`] performs the
//! network side of every operation and then runs the mutation on that context.
//! Threads opened in a secondary view get their own single-thread
//! `InboxState` on a separate context; [`ThreadWrapper`] hides which one a
//! thread lives on.

mod reconciler;
mod state;
mod wrapper;

pub use reconciler::InboxReconciler;
pub use state::InboxState;
pub use wrapper::ThreadWrapper;

use crate::collection::{ChangeSet, Handle};
use crate::models::{Thread, ThreadKey};

/// Notification published by the inbox context.
#[derive(Debug, Clone, PartialEq)]
pub enum InboxEvent {
    /// The thread collection changed; one event per logical operation.
    Changed { changes: ChangeSet },
    /// The selection cursor moved.
    SelectionChanged { selected: Option<ThreadKey> },
    /// The first inbox load since start (or since the last clear) completed.
    FirstUpdated,
}

/// The selection cursor.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    #[default]
    None,
    /// A live thread in the collection.
    Attached(Handle),
    /// A thread that is not (or no longer) in the collection, kept by value.
    Detached(Thread),
}

impl Selection {
    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn handle(&self) -> Option<Handle> {
        match self {
            Selection::Attached(handle) => Some(*handle),
            _ => None,
        }
    }
}

/// How much of the inbox listing has been loaded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pagination {
    /// Pages loaded so far, including the newest page
    pub pages_loaded: usize,
    /// Cursor for the next older page
    pub oldest_cursor: Option<String>,
    pub has_older: bool,
    pub unseen_count: u32,
}
