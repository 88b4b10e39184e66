//! Debounced recipient search.

use std::sync::Arc;

use super::{SessionOrchestrator, SEARCH_DEBOUNCE_KEY};
use crate::models::{BaseUser, RecipientSearchResult, Thread};
use crate::traits::RemoteClient;

impl SessionOrchestrator {
    /// Search recipients and hand the results to `on_results` as threads.
    ///
    /// Matching threads come first, then one direct placeholder per matching
    /// user; every entry's preview line shows who is in it. Returns whether
    /// `on_results` was called: overlong queries, superseded calls and failed
    /// searches are dropped silently.
    pub async fn search<F>(&self, query: &str, on_results: F) -> bool
    where
        F: FnOnce(Vec<Thread>) + Send,
    {
        let Some(result) = self.debounced_search(query, true).await else {
            return false;
        };

        let RecipientSearchResult { users, threads } = result;
        let mut found: Vec<Thread> = threads
            .into_iter()
            .chain(users.into_iter().map(Thread::direct_with))
            .collect();
        for thread in &mut found {
            thread.decorate_search_preview();
        }

        tracing::debug!(query, results = found.len(), "Search results ready");
        on_results(found);
        true
    }

    /// Search users only. `on_results` is only called with a non-empty list.
    pub async fn search_without_threads<F>(&self, query: &str, on_results: F) -> bool
    where
        F: FnOnce(Vec<BaseUser>) + Send,
    {
        let Some(result) = self.debounced_search(query, false).await else {
            return false;
        };
        if result.users.is_empty() {
            return false;
        }

        tracing::debug!(query, results = result.users.len(), "User search results ready");
        on_results(result.users);
        true
    }

    async fn debounced_search(&self, query: &str, include_threads: bool) -> Option<RecipientSearchResult> {
        let len = query.chars().count();
        if len > self.config.search_max_query_len {
            tracing::trace!(len, "Search query too long, ignoring");
            return None;
        }
        if !self
            .debouncer
            .delay(SEARCH_DEBOUNCE_KEY, self.config.search_debounce)
            .await
        {
            return None;
        }

        let remote: Arc<dyn RemoteClient> = match self.remote.require_authenticated("search_recipients") {
            Ok(remote) => remote,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping search");
                return None;
            }
        };

        match remote.search_recipients(query, include_threads).await {
            Ok(result) => {
                self.registry.record_all(&result.users);
                self.registry.record_threads(&result.threads);
                Some(result)
            }
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), query, "Recipient search failed");
                None
            }
        }
    }
}
