//! Keyed debouncing of repeated triggers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Collapses rapid calls sharing a key so only the last one proceeds.
///
/// Each call takes a ticket; after its window it proceeds only if no later
/// call with the same key took a newer ticket in the meantime. Superseded
/// calls report `false` and are never retried.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    inner: Arc<Mutex<Tickets>>,
}

#[derive(Debug, Default)]
struct Tickets {
    next: u64,
    latest: HashMap<String, u64>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait `window`, then report whether this call is still the latest for `key`.
    pub async fn delay(&self, key: &str, window: Duration) -> bool {
        let ticket = {
            let mut tickets = self.lock();
            tickets.next += 1;
            let ticket = tickets.next;
            tickets.latest.insert(key.to_string(), ticket);
            ticket
        };

        tokio::time::sleep(window).await;

        let mut tickets = self.lock();
        let ready = tickets.latest.get(key) == Some(&ticket);
        if ready {
            tickets.latest.remove(key);
        } else {
            tracing::trace!(key, ticket, "Debounced call superseded");
        }
        ready
    }

    /// Keys with a call currently waiting.
    pub fn pending(&self) -> usize {
        self.lock().latest.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tickets> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
