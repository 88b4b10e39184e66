//! User presence polling.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::models::{PresenceValue, UserId};
use crate::traits::SharedRemote;

/// Shared user id → presence map.
///
/// The map object is never replaced; updates overwrite entries id by id, so
/// every clone keeps observing the live state.
#[derive(Debug, Clone, Default)]
pub struct PresenceMap {
    inner: Arc<RwLock<HashMap<UserId, PresenceValue>>>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: UserId) -> Option<PresenceValue> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
    }

    /// Last-write-wins merge; ids missing from `update` keep their value.
    pub fn apply(&self, update: HashMap<UserId, PresenceValue>) -> usize {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let count = update.len();
        for (user_id, value) in update {
            map.insert(user_id, value);
        }
        count
    }

    pub fn snapshot(&self) -> HashMap<UserId, PresenceValue> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two handles observe the same underlying map.
    pub fn same_map(&self, other: &PresenceMap) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Refreshes a [`PresenceMap`] from the remote client.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    remote: SharedRemote,
    map: PresenceMap,
}

impl PresenceTracker {
    pub fn new(remote: SharedRemote) -> Self {
        Self {
            remote,
            map: PresenceMap::new(),
        }
    }

    /// Handle to the live map.
    pub fn map(&self) -> PresenceMap {
        self.map.clone()
    }

    pub fn get(&self, user_id: UserId) -> Option<PresenceValue> {
        self.map.get(user_id)
    }

    /// Fetch presence and merge it into the map.
    ///
    /// Failures are logged and leave the map untouched. Returns whether an
    /// update was applied.
    pub async fn refresh(&self) -> bool {
        let remote = match self.remote.require_authenticated("fetch_presence") {
            Ok(remote) => remote,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping presence refresh");
                return false;
            }
        };

        match remote.fetch_presence().await {
            Ok(update) => {
                let count = self.map.apply(update);
                tracing::debug!(updated = count, "Presence refreshed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "Presence refresh failed");
                false
            }
        }
    }
}
