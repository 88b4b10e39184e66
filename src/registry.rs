//! Process-lifetime registry of known users.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::models::{BaseUser, Reel, Thread, UserId};

/// Last known profile of every user seen in any response.
///
/// Updated opportunistically and never evicted. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct UserRegistry {
    users: Arc<RwLock<HashMap<UserId, BaseUser>>>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, user: &BaseUser) {
        self.record_all(std::iter::once(user));
    }

    pub fn record_all<'a>(&self, users: impl IntoIterator<Item = &'a BaseUser>) {
        let mut map = self.users.write().unwrap_or_else(PoisonError::into_inner);
        for user in users {
            if user.pk == 0 {
                continue;
            }
            map.insert(user.pk, user.clone());
        }
    }

    pub fn record_threads<'a>(&self, threads: impl IntoIterator<Item = &'a Thread>) {
        self.record_all(threads.into_iter().flat_map(|t| t.users.iter()));
    }

    pub fn record_reels<'a>(&self, reels: impl IntoIterator<Item = &'a Reel>) {
        self.record_all(reels.into_iter().map(|r| &r.owner));
    }

    pub fn get(&self, pk: UserId) -> Option<BaseUser> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&pk)
            .cloned()
    }

    /// Known profile for `pk`, or a bare user carrying only the id.
    pub fn get_or_bare(&self, pk: UserId) -> BaseUser {
        self.get(pk)
            .unwrap_or_else(|| BaseUser::new(pk, pk.to_string()))
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
