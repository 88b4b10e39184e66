//! State owned by an inbox (or secondary view) context.
//!
//! Everything here is synchronous and runs inside a single dispatcher job, so
//! observers only ever see the state before or after a whole operation.

use std::collections::HashSet;

use tokio::sync::broadcast;

use super::{InboxEvent, Pagination, Selection};
use crate::collection::{Change, ChangeSet, Collection, Handle};
use crate::config::StaleSelectionPolicy;
use crate::models::{Thread, ThreadKey};

#[derive(Debug)]
pub struct InboxState {
    pub(crate) threads: Collection<Thread>,
    pub(crate) selection: Selection,
    pub(crate) pagination: Pagination,
    first_updated: bool,
    /// Thread id to select once the first load lands
    pending_open: Option<String>,
    /// Selection was detached by `clear`, the policy applies on the next snapshot
    detached_by_clear: bool,
    policy: StaleSelectionPolicy,
    events: Option<broadcast::Sender<InboxEvent>>,
}

impl InboxState {
    pub(crate) fn new(policy: StaleSelectionPolicy, events: Option<broadcast::Sender<InboxEvent>>) -> Self {
        Self {
            threads: Collection::new(),
            selection: Selection::None,
            pagination: Pagination::default(),
            first_updated: false,
            pending_open: None,
            detached_by_clear: false,
            policy,
            events,
        }
    }

    /// Standalone state holding one selected thread, for a secondary view.
    pub(crate) fn secondary(thread: Thread) -> (Self, Handle) {
        let mut state = Self::new(StaleSelectionPolicy::Keep, None);
        let (handle, _) = state.threads.push(thread);
        state.selection = Selection::Attached(handle);
        state.first_updated = true;
        (state, handle)
    }

    pub fn threads(&self) -> &Collection<Thread> {
        &self.threads
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn is_first_updated(&self) -> bool {
        self.first_updated
    }

    pub fn selected_key(&self) -> Option<ThreadKey> {
        match &self.selection {
            Selection::None => None,
            Selection::Attached(handle) => self.threads.get(*handle).map(Thread::key),
            Selection::Detached(thread) => Some(thread.key()),
        }
    }

    pub fn selected_thread(&self) -> Option<Thread> {
        match &self.selection {
            Selection::None => None,
            Selection::Attached(handle) => self.threads.get(*handle).cloned(),
            Selection::Detached(thread) => Some(thread.clone()),
        }
    }

    fn publish(&self, event: InboxEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn publish_changes(&self, changes: ChangeSet) {
        if !changes.is_empty() {
            self.publish(InboxEvent::Changed { changes });
        }
    }

    pub(crate) fn set_selection(&mut self, selection: Selection) {
        if self.selection == selection {
            return;
        }
        self.detached_by_clear = false;
        self.selection = selection;
        let selected = self.selected_key();
        tracing::debug!(?selected, "Selection changed");
        self.publish(InboxEvent::SelectionChanged { selected });
    }

    /// Select `thread`: the live copy when the collection has one, the value otherwise.
    pub(crate) fn select_thread(&mut self, thread: Thread) -> Selection {
        let selection = match self.threads.find(&thread.key()) {
            Some(handle) => Selection::Attached(handle),
            None => Selection::Detached(thread),
        };
        self.set_selection(selection.clone());
        selection
    }

    /// Reconcile a fetched window of the inbox and re-resolve the selection.
    ///
    /// Returns the number of observable changes.
    pub(crate) fn apply_snapshot(&mut self, threads: Vec<Thread>, pagination: Pagination) -> usize {
        let result = self.threads.reconcile(threads);
        if result.skipped && !self.threads.is_empty() {
            tracing::debug!("Inbox snapshot empty, keeping current threads and paging");
            return 0;
        }
        self.pagination = pagination;

        let count = result.changes.len();
        if !result.skipped {
            self.publish_changes(result.changes);
            self.resolve_selection(&result.removed, self.policy);
            self.expire_cleared_selection();
        }
        self.after_update();
        count
    }

    /// Append an older page, merging threads that are already present.
    ///
    /// Returns `None` when the page no longer follows the loaded window
    /// (another load or a reload got there first).
    pub(crate) fn append_page(
        &mut self,
        expected_cursor: &str,
        threads: Vec<Thread>,
        oldest_cursor: Option<String>,
        has_older: bool,
    ) -> Option<usize> {
        if self.pagination.oldest_cursor.as_deref() != Some(expected_cursor) {
            return None;
        }

        let mut changes = Vec::new();
        let mut seen = HashSet::new();
        for thread in threads {
            let key = thread.key();
            if !seen.insert(key.clone()) {
                continue;
            }
            match self.threads.find(&key) {
                Some(handle) => changes.extend(self.threads.absorb(handle, &thread)),
                None => changes.push(self.threads.push(thread).1),
            }
        }

        self.pagination.pages_loaded += 1;
        self.pagination.oldest_cursor = oldest_cursor;
        self.pagination.has_older = has_older;

        let count = changes.len();
        self.publish_changes(changes);
        self.resolve_selection(&[], self.policy);
        Some(count)
    }

    /// Drop all threads and paging state.
    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.threads.clear();
        self.pagination = Pagination::default();
        self.first_updated = false;

        if !removed.is_empty() {
            self.publish_changes(vec![Change::Cleared]);
        }
        let was_attached = matches!(self.selection, Selection::Attached(_));
        self.resolve_selection(&removed, StaleSelectionPolicy::Keep);
        self.detached_by_clear = was_attached && matches!(self.selection, Selection::Detached(_));
        removed.len()
    }

    /// Merge a freshly fetched copy into the thread at `handle`.
    ///
    /// `None` when the thread is no longer part of this state.
    pub(crate) fn update_thread(&mut self, handle: Handle, fetched: &Thread) -> Option<bool> {
        if !self.threads.contains(handle) {
            return None;
        }
        let change = self.threads.absorb(handle, fetched);
        let changed = change.is_some();
        self.publish_changes(change.into_iter().collect());
        Some(changed)
    }

    pub(crate) fn mark_seen(&mut self, handle: Handle, item_id: &str) -> bool {
        let already = self
            .threads
            .get(handle)
            .map_or(true, |t| t.last_seen_item_id.as_deref() == Some(item_id));
        if already {
            return false;
        }
        let item_id = item_id.to_string();
        match self.threads.update(handle, |t| t.last_seen_item_id = Some(item_id)) {
            Some((_, change)) => {
                self.publish_changes(vec![change]);
                true
            }
            None => false,
        }
    }

    /// Select `thread_id` now if the inbox has loaded, otherwise on first load.
    pub(crate) fn open_when_ready(&mut self, thread_id: &str) -> bool {
        if !self.first_updated {
            tracing::debug!(thread_id, "Inbox not loaded yet, deferring open");
            self.pending_open = Some(thread_id.to_string());
            return false;
        }
        self.select_by_id(thread_id)
    }

    fn select_by_id(&mut self, thread_id: &str) -> bool {
        match self.threads.find(&ThreadKey::Id(thread_id.to_string())) {
            Some(handle) => {
                self.set_selection(Selection::Attached(handle));
                true
            }
            None => {
                tracing::debug!(thread_id, "Thread to open is not in the inbox");
                false
            }
        }
    }

    fn after_update(&mut self) {
        let first = !self.first_updated;
        self.first_updated = true;

        if let Some(thread_id) = self.pending_open.take() {
            self.select_by_id(&thread_id);
        }
        if first {
            self.publish(InboxEvent::FirstUpdated);
        }
    }

    /// A selection detached by `clear` that the reload did not bring back
    /// becomes stale only now.
    fn expire_cleared_selection(&mut self) {
        if !std::mem::take(&mut self.detached_by_clear) {
            return;
        }
        if self.policy == StaleSelectionPolicy::Clear && matches!(self.selection, Selection::Detached(_)) {
            self.set_selection(Selection::None);
        }
    }

    /// Keep the selection pointing at a live thread after the collection changed.
    ///
    /// `removed` holds the last value of every entry the change dropped.
    fn resolve_selection(&mut self, removed: &[(Handle, Thread)], policy: StaleSelectionPolicy) {
        let next = match &self.selection {
            Selection::None => return,
            Selection::Attached(handle) if self.threads.contains(*handle) => return,
            Selection::Attached(handle) => {
                let last = removed
                    .iter()
                    .find(|(h, _)| h == handle)
                    .map(|(_, thread)| thread.clone());
                match last {
                    Some(thread) => match self.threads.find(&thread.key()) {
                        Some(replacement) => Selection::Attached(replacement),
                        None => match policy {
                            StaleSelectionPolicy::Keep => {
                                tracing::debug!(thread_id = %thread.thread_id, "Selected thread left the inbox, keeping it detached");
                                Selection::Detached(thread)
                            }
                            StaleSelectionPolicy::Clear => Selection::None,
                        },
                    },
                    None => Selection::None,
                }
            }
            Selection::Detached(thread) => match self.threads.find(&thread.key()) {
                Some(handle) => Selection::Attached(handle),
                None => return,
            },
        };
        self.set_selection(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BaseUser;

    fn thread(id: &str, title: &str) -> Thread {
        let mut t = Thread::new(id, vec![BaseUser::new(id.len() as i64, id)]);
        t.title = title.to_string();
        t
    }

    fn state(policy: StaleSelectionPolicy) -> (InboxState, broadcast::Receiver<InboxEvent>) {
        let (tx, rx) = broadcast::channel(32);
        (InboxState::new(policy, Some(tx)), rx)
    }

    fn page() -> Pagination {
        Pagination {
            pages_loaded: 1,
            ..Default::default()
        }
    }

    fn titles(state: &InboxState) -> Vec<String> {
        state.threads.iter().map(|(_, t)| t.title.clone()).collect()
    }

    #[test]
    fn test_selection_survives_replacement() {
        let (mut state, _rx) = state(StaleSelectionPolicy::Keep);
        state.apply_snapshot(vec![thread("5", "old"), thread("6", "x")], page());
        let handle = state.threads.find(&ThreadKey::Id("5".into())).unwrap();
        state.set_selection(Selection::Attached(handle));

        state.apply_snapshot(vec![thread("6", "x"), thread("5", "new")], page());

        assert_eq!(state.selection, Selection::Attached(handle));
        let selected = state.selected_thread().unwrap();
        assert_eq!(selected.thread_id, "5");
        assert_eq!(selected.title, "new");
    }

    #[test]
    fn test_stale_selection_kept_detached() {
        let (mut state, _rx) = state(StaleSelectionPolicy::Keep);
        state.apply_snapshot(vec![thread("1", "a"), thread("2", "b")], page());
        state.select_thread(thread("1", "a"));

        state.apply_snapshot(vec![thread("2", "b")], page());
        assert!(matches!(&state.selection, Selection::Detached(t) if t.thread_id == "1"));

        // Reappears: re-attached to the new live entry
        state.apply_snapshot(vec![thread("1", "back"), thread("2", "b")], page());
        let handle = state.selection.handle().unwrap();
        assert_eq!(state.threads.get(handle).unwrap().title, "back");
    }

    #[test]
    fn test_stale_selection_cleared_by_policy() {
        let (mut state, _rx) = state(StaleSelectionPolicy::Clear);
        state.apply_snapshot(vec![thread("1", "a"), thread("2", "b")], page());
        state.select_thread(thread("1", "a"));

        state.apply_snapshot(vec![thread("2", "b")], page());
        assert!(state.selection.is_none());
    }

    #[test]
    fn test_clear_then_reload_keeps_selection_under_clear_policy() {
        let (mut state, _rx) = state(StaleSelectionPolicy::Clear);
        state.apply_snapshot(vec![thread("1", "a"), thread("2", "b")], page());
        state.select_thread(thread("1", "a"));

        state.clear();
        assert!(matches!(&state.selection, Selection::Detached(t) if t.thread_id == "1"));

        state.apply_snapshot(vec![thread("2", "b"), thread("1", "a")], page());
        let handle = state.selection.handle().unwrap();
        assert_eq!(state.threads.get(handle).unwrap().thread_id, "1");
    }

    #[test]
    fn test_clear_then_reload_without_thread_applies_clear_policy() {
        let (mut state, _rx) = state(StaleSelectionPolicy::Clear);
        state.apply_snapshot(vec![thread("1", "a")], page());
        state.select_thread(thread("1", "a"));

        state.clear();
        state.apply_snapshot(vec![thread("2", "b")], page());
        assert!(state.selection.is_none());
    }

    #[test]
    fn test_empty_snapshot_keeps_threads_and_paging() {
        let (mut state, _rx) = state(StaleSelectionPolicy::Keep);
        let loaded = Pagination {
            pages_loaded: 2,
            oldest_cursor: Some("c2".into()),
            has_older: true,
            unseen_count: 0,
        };
        state.apply_snapshot(vec![thread("1", "a"), thread("2", "b")], loaded.clone());

        assert_eq!(state.apply_snapshot(Vec::new(), page()), 0);
        assert_eq!(state.pagination, loaded);
        assert_eq!(titles(&state), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_first_load_still_counts_as_loaded() {
        let (mut state, _rx) = state(StaleSelectionPolicy::Keep);
        state.apply_snapshot(Vec::new(), page());
        assert!(state.is_first_updated());
        assert_eq!(state.pagination.pages_loaded, 1);
    }

    #[test]
    fn test_snapshot_publishes_one_batch_and_first_updated() {
        let (mut state, mut rx) = state(StaleSelectionPolicy::Keep);
        state.apply_snapshot(vec![thread("1", "a"), thread("2", "b")], page());

        assert!(matches!(rx.try_recv(), Ok(InboxEvent::Changed { changes }) if changes.len() == 2));
        assert_eq!(rx.try_recv().ok(), Some(InboxEvent::FirstUpdated));
        assert!(rx.try_recv().is_err());

        // Identical snapshot: nothing at all
        state.apply_snapshot(vec![thread("1", "a"), thread("2", "b")], page());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_append_page_merges_and_rejects_stale_cursor() {
        let (mut state, _rx) = state(StaleSelectionPolicy::Keep);
        state.apply_snapshot(
            vec![thread("1", "a")],
            Pagination {
                pages_loaded: 1,
                oldest_cursor: Some("c1".into()),
                has_older: true,
                unseen_count: 0,
            },
        );

        assert_eq!(state.append_page("c0", vec![thread("9", "z")], None, false), None);

        let added = state
            .append_page("c1", vec![thread("1", "a2"), thread("2", "b"), thread("2", "b")], None, false)
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(titles(&state), vec!["a2", "b"]);
        assert_eq!(state.pagination.pages_loaded, 2);
        assert!(!state.pagination.has_older);
    }

    #[test]
    fn test_open_when_ready_defers_until_first_update() {
        let (mut state, _rx) = state(StaleSelectionPolicy::Keep);
        assert!(!state.open_when_ready("2"));
        assert!(state.selection.is_none());

        state.apply_snapshot(vec![thread("1", "a"), thread("2", "b")], page());
        assert_eq!(state.selected_key(), Some(ThreadKey::Id("2".into())));

        assert!(state.open_when_ready("1"));
        assert_eq!(state.selected_key(), Some(ThreadKey::Id("1".into())));
    }

    #[test]
    fn test_clear_detaches_selection_and_resets_paging() {
        let (mut state, _rx) = state(StaleSelectionPolicy::Keep);
        state.apply_snapshot(vec![thread("1", "a")], page());
        state.select_thread(thread("1", "a"));

        assert_eq!(state.clear(), 1);
        assert!(state.threads.is_empty());
        assert!(!state.is_first_updated());
        assert_eq!(state.pagination, Pagination::default());
        assert!(matches!(state.selection, Selection::Detached(_)));
    }

    #[test]
    fn test_mark_seen_only_changes_once() {
        let (mut state, _rx) = state(StaleSelectionPolicy::Keep);
        state.apply_snapshot(vec![thread("1", "a")], page());
        let handle = state.threads.handles()[0];
        assert!(state.mark_seen(handle, "i1"));
        assert!(!state.mark_seen(handle, "i1"));
    }

    #[test]
    fn test_secondary_state_is_selected() {
        let (state, handle) = InboxState::secondary(thread("7", "t"));
        assert_eq!(state.selection, Selection::Attached(handle));
        assert!(state.is_first_updated());
    }
}
