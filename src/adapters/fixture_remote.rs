//! Remote client backed by recorded JSON snapshots.
//!
//! Layout of a fixture directory:
//!
//! | File | Content |
//! |------|---------|
//! | `user.json` | logged-in [`BaseUser`] |
//! | `reel_tray.json` | `[Reel]` in tray order |
//! | `inbox.json` | newest [`InboxPage`] |
//! | `inbox_<cursor>.json` | older page for `<cursor>` |
//! | `threads/<thread_id>.json` | one [`Thread`] |
//! | `presence.json` | `{ "<user id>": PresenceValue }` |
//! | `search.json` | [`RecipientSearchResult`] |
//!
//! Missing optional files (presence, search, reel tray) read as empty. Write
//! operations are accepted and only logged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::RemoteError;
use crate::models::{
    BaseUser, InboxPage, LoginOutcome, PresenceValue, RecipientSearchResult, Reel, SessionData,
    Thread, UserId,
};
use crate::traits::{RemoteClient, RemoteClientFactory};

#[derive(Debug)]
pub struct FixtureRemote {
    dir: PathBuf,
    session: Mutex<SessionData>,
}

impl FixtureRemote {
    pub fn new(dir: impl Into<PathBuf>, session: SessionData) -> Self {
        Self {
            dir: dir.into(),
            session: Mutex::new(session),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load<T: DeserializeOwned>(&self, relative: &str) -> Result<Option<T>, RemoteError> {
        let path = self.dir.join(relative);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RemoteError::Network(format!("{}: {}", path.display(), e))),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| RemoteError::InvalidResponse(format!("{}: {}", relative, e)))
    }

    async fn require<T: DeserializeOwned>(&self, relative: &str) -> Result<T, RemoteError> {
        self.load(relative).await?.ok_or_else(|| RemoteError::Status {
            status: 404,
            message: format!("no fixture '{}'", relative),
        })
    }

    fn ensure_authenticated(&self) -> Result<(), RemoteError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(RemoteError::NotAuthenticated)
        }
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }

    async fn sign_in(&self) -> Result<LoginOutcome, RemoteError> {
        let user: BaseUser = self.require("user.json").await?;
        self.with_session(|session| {
            session.logged_in_user = Some(user.clone());
            session.auth_token = Some(format!("fixture-{}", session.device_id));
        });
        Ok(LoginOutcome::LoggedIn { user })
    }

    async fn all_inbox_threads(&self) -> Result<Vec<Thread>, RemoteError> {
        let mut threads = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.fetch_inbox_page(cursor.as_deref()).await?;
            threads.extend(page.threads);
            match page.oldest_cursor {
                Some(next) if page.has_older && cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next)
                }
                _ => break,
            }
        }
        Ok(threads)
    }
}

#[async_trait]
impl RemoteClient for FixtureRemote {
    fn is_authenticated(&self) -> bool {
        self.with_session(|session| session.is_authenticated())
    }

    fn session(&self) -> SessionData {
        self.with_session(|session| session.clone())
    }

    async fn login(&self, username: &str, _password: &str) -> Result<LoginOutcome, RemoteError> {
        tracing::info!(username, "Fixture login");
        self.sign_in().await
    }

    async fn login_with_facebook(&self, _access_token: &str) -> Result<LoginOutcome, RemoteError> {
        tracing::info!("Fixture login with Facebook");
        self.sign_in().await
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        self.with_session(|session| session.invalidate());
        Ok(())
    }

    async fn fetch_current_user(&self) -> Result<BaseUser, RemoteError> {
        self.ensure_authenticated()?;
        self.require("user.json").await
    }

    async fn fetch_reel_tray(&self) -> Result<Vec<Reel>, RemoteError> {
        self.ensure_authenticated()?;
        Ok(self.load("reel_tray.json").await?.unwrap_or_default())
    }

    async fn fetch_thread_page(&self, thread_id: &str, _max_pages: u32) -> Result<Thread, RemoteError> {
        self.ensure_authenticated()?;
        if let Some(thread) = self.load(&format!("threads/{}.json", thread_id)).await? {
            return Ok(thread);
        }
        self.all_inbox_threads()
            .await?
            .into_iter()
            .find(|t| t.thread_id == thread_id)
            .ok_or_else(|| RemoteError::Status {
                status: 404,
                message: format!("thread {} not found", thread_id),
            })
    }

    async fn fetch_inbox_page(&self, cursor: Option<&str>) -> Result<InboxPage, RemoteError> {
        self.ensure_authenticated()?;
        match cursor {
            None => self.require("inbox.json").await,
            Some(cursor) => self.require(&format!("inbox_{}.json", cursor)).await,
        }
    }

    async fn fetch_presence(&self) -> Result<HashMap<UserId, PresenceValue>, RemoteError> {
        self.ensure_authenticated()?;
        Ok(self.load("presence.json").await?.unwrap_or_default())
    }

    async fn create_group_thread(&self, user_ids: &[UserId]) -> Result<Thread, RemoteError> {
        self.ensure_authenticated()?;
        let users = user_ids
            .iter()
            .map(|pk| BaseUser::new(*pk, pk.to_string()))
            .collect();
        Ok(Thread::new(uuid::Uuid::new_v4().simple().to_string(), users))
    }

    async fn find_thread_by_participants(&self, user_ids: &[UserId]) -> Result<Thread, RemoteError> {
        self.ensure_authenticated()?;
        let mut wanted = user_ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let found = self.all_inbox_threads().await?.into_iter().find(|t| {
            let mut ids = t.participant_ids();
            ids.sort_unstable();
            ids.dedup();
            ids == wanted
        });
        Ok(found.unwrap_or_default())
    }

    async fn search_recipients(
        &self,
        query: &str,
        include_threads: bool,
    ) -> Result<RecipientSearchResult, RemoteError> {
        self.ensure_authenticated()?;
        let mut result: RecipientSearchResult = self.load("search.json").await?.unwrap_or_default();
        let needle = query.to_lowercase();
        result.users.retain(|u| {
            u.username.to_lowercase().contains(&needle) || u.full_name.to_lowercase().contains(&needle)
        });
        if !include_threads {
            result.threads.clear();
        }
        Ok(result)
    }

    async fn mark_item_seen(&self, thread_id: &str, item_id: &str) -> Result<(), RemoteError> {
        self.ensure_authenticated()?;
        tracing::debug!(thread_id, item_id, "Fixture mark seen");
        Ok(())
    }

    async fn send_reel_share(
        &self,
        owner_id: UserId,
        media_id: &str,
        thread_id: &str,
        text: &str,
    ) -> Result<(), RemoteError> {
        self.ensure_authenticated()?;
        tracing::info!(owner_id, media_id, thread_id, len = text.len(), "Fixture reel share");
        Ok(())
    }

    async fn start_push(&self) -> Result<(), RemoteError> {
        Err(RemoteError::Other("push is not available for fixtures".to_string()))
    }
}

/// Creates [`FixtureRemote`] clients reading from one directory.
#[derive(Debug, Clone)]
pub struct FixtureRemoteFactory {
    dir: PathBuf,
}

impl FixtureRemoteFactory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl RemoteClientFactory for FixtureRemoteFactory {
    fn create(&self, session: SessionData) -> Arc<dyn RemoteClient> {
        Arc::new(FixtureRemote::new(self.dir.clone(), session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, value: serde_json::Value) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, serde_json::to_vec(&value).unwrap()).unwrap();
    }

    fn fixture_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "user.json", serde_json::json!({"pk": 1, "username": "me"}));
        write(
            dir.path(),
            "inbox.json",
            serde_json::json!({
                "threads": [{"thread_id": "10", "users": [{"pk": 2, "username": "ann"}]}],
                "oldest_cursor": "c1",
                "has_older": true
            }),
        );
        write(
            dir.path(),
            "inbox_c1.json",
            serde_json::json!({
                "threads": [{"thread_id": 11, "users": [{"pk": 3, "username": "bob"}, {"pk": 4, "username": "cy"}]}],
                "has_older": false
            }),
        );
        dir
    }

    #[tokio::test]
    async fn test_requires_login() {
        let dir = fixture_dir();
        let remote = FixtureRemote::new(dir.path(), SessionData::new());
        assert_eq!(
            remote.fetch_inbox_page(None).await.unwrap_err(),
            RemoteError::NotAuthenticated
        );

        let outcome = remote.login("me", "pw").await.unwrap();
        assert!(outcome.is_logged_in());
        assert!(remote.is_authenticated());
        assert_eq!(remote.fetch_inbox_page(None).await.unwrap().threads.len(), 1);
    }

    #[tokio::test]
    async fn test_thread_falls_back_to_inbox_pages() {
        let dir = fixture_dir();
        let remote = FixtureRemote::new(dir.path(), SessionData::new());
        remote.login("me", "pw").await.unwrap();

        let thread = remote.fetch_thread_page("11", 1).await.unwrap();
        assert_eq!(thread.users.len(), 2);
        assert!(remote.fetch_thread_page("99", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_find_by_participants_ignores_order() {
        let dir = fixture_dir();
        let remote = FixtureRemote::new(dir.path(), SessionData::new());
        remote.login("me", "pw").await.unwrap();

        let found = remote.find_thread_by_participants(&[4, 3]).await.unwrap();
        assert_eq!(found.thread_id, "11");
        let missing = remote.find_thread_by_participants(&[7]).await.unwrap();
        assert!(missing.users.is_empty());
    }

    #[tokio::test]
    async fn test_optional_files_read_empty() {
        let dir = fixture_dir();
        let remote = FixtureRemote::new(dir.path(), SessionData::new());
        remote.login("me", "pw").await.unwrap();
        assert!(remote.fetch_reel_tray().await.unwrap().is_empty());
        assert!(remote.fetch_presence().await.unwrap().is_empty());
    }
}
