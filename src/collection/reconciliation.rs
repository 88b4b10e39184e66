//! Snapshot reconciliation for [`Collection`]

use std::collections::HashSet;

use super::{Change, ChangeSet, Collection, Handle, Reconcilable};

/// Outcome of merging one snapshot into a collection.
#[derive(Debug, Clone)]
pub struct Reconciliation<T> {
    /// Observable changes in the order they were applied
    pub changes: ChangeSet,
    /// Entities dropped because the snapshot no longer names them
    pub removed: Vec<(Handle, T)>,
    /// The snapshot was empty and the collection was left untouched
    pub skipped: bool,
}

impl<T> Reconciliation<T> {
    fn skipped() -> Self {
        Self {
            changes: Vec::new(),
            removed: Vec::new(),
            skipped: true,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

impl<T: Reconcilable> Collection<T> {
    /// Merge a freshly fetched ordered snapshot into the collection.
    ///
    /// Afterwards the collection has exactly the snapshot's identities in the
    /// snapshot's order. Entities present before and after keep their handle and
    /// are updated in place; only new identities get new handles.
    ///
    /// An empty snapshot means the fetch produced no usable data and is ignored.
    /// Duplicate identities inside the snapshot collapse to the first occurrence.
    pub fn reconcile(&mut self, target: Vec<T>) -> Reconciliation<T> {
        if target.is_empty() {
            return Reconciliation::skipped();
        }

        let target = dedup_by_identity(target);
        let target_keys: HashSet<T::Key> = target.iter().map(|item| item.identity()).collect();

        let mut changes = Vec::new();
        let mut removed = Vec::new();

        // Drop live entries the snapshot no longer names, preserving order
        let mut i = 0;
        while i < self.order.len() {
            let handle = self.order[i];
            let keep = self
                .slots
                .get(&handle)
                .is_some_and(|item| target_keys.contains(&item.identity()));
            if keep {
                i += 1;
                continue;
            }
            self.order.remove(i);
            if let Some(item) = self.slots.remove(&handle) {
                removed.push((handle, item));
            }
            changes.push(Change::Removed { index: i, handle });
        }

        // Walk the snapshot, updating matches in place and moving them into position
        for (i, item) in target.into_iter().enumerate() {
            let key = item.identity();
            let existing = self.order[i..]
                .iter()
                .position(|h| self.slots.get(h).is_some_and(|live| live.identity() == key))
                .map(|offset| i + offset);

            match existing {
                Some(j) => {
                    let handle = self.order[j];
                    if let Some(change) = self.absorb(handle, &item) {
                        changes.push(change);
                    }
                    if j != i {
                        self.order.remove(j);
                        self.order.insert(i, handle);
                        changes.push(Change::Moved {
                            from: j,
                            to: i,
                            handle,
                        });
                    }
                }
                None => {
                    let (_, change) = self.insert(i, item);
                    changes.push(change);
                }
            }
        }

        Reconciliation {
            changes,
            removed,
            skipped: false,
        }
    }
}

fn dedup_by_identity<T: Reconcilable>(target: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(target.len());
    let before = target.len();
    let deduped: Vec<T> = target
        .into_iter()
        .filter(|item| seen.insert(item.identity()))
        .collect();
    if deduped.len() != before {
        tracing::warn!(
            dropped = before - deduped.len(),
            "Snapshot contained duplicate identities; keeping first occurrences"
        );
    }
    deduped
}
