use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BaseUser;

/// Persisted session shared between successive remote client instances.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    /// Stable per-install device id sent with every request
    pub device_id: String,
    #[serde(default)]
    pub logged_in_user: Option<BaseUser>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    /// Fresh, unauthenticated session with a newly generated device id.
    pub fn new() -> Self {
        Self {
            device_id: Uuid::new_v4().to_string(),
            logged_in_user: None,
            auth_token: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some() && self.logged_in_user.is_some()
    }

    /// Drop credentials but keep the device identity.
    pub fn invalidate(&mut self) {
        self.auth_token = None;
        self.logged_in_user = None;
    }
}

impl Default for SessionData {
    fn default() -> Self {
        Self::new()
    }
}

/// Local, per-thread metadata that never comes from the remote side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ThreadInfo {
    #[serde(default)]
    pub last_opened_at: Option<DateTime<Utc>>,
    /// Unsent message text
    #[serde(default)]
    pub draft: Option<String>,
    #[serde(default)]
    pub last_seen_item_id: Option<String>,
}

/// Thread id → local metadata.
pub type ThreadInfoMap = HashMap<String, ThreadInfo>;

/// Result of a login attempt that reached the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    LoggedIn { user: BaseUser },
    /// Credentials accepted, a second factor is needed to finish
    TwoFactorRequired { identifier: String },
    BadPassword,
    /// The server wants the user to complete a checkpoint in a browser
    ChallengeRequired { url: String },
}

impl LoginOutcome {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, LoginOutcome::LoggedIn { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_uuid_device_id() {
        let session = SessionData::new();
        assert!(Uuid::parse_str(&session.device_id).is_ok());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_invalidate_keeps_device_id() {
        let mut session = SessionData::new();
        session.auth_token = Some("token".to_string());
        session.logged_in_user = Some(BaseUser::new(1, "me"));
        assert!(session.is_authenticated());

        let device_id = session.device_id.clone();
        session.invalidate();
        assert!(!session.is_authenticated());
        assert_eq!(session.device_id, device_id);
    }

    #[test]
    fn test_login_outcome_tagging() {
        let outcome: LoginOutcome =
            serde_json::from_str(r#"{"status":"two_factor_required","identifier":"abc"}"#).unwrap();
        assert_eq!(
            outcome,
            LoginOutcome::TwoFactorRequired {
                identifier: "abc".to_string()
            }
        );
        assert!(!outcome.is_logged_in());
    }
}
