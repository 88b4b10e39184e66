use serde::{Deserialize, Serialize};

use super::Thread;

/// Numeric user id assigned by the remote side.
pub type UserId = i64;

/// Minimal user profile as carried by inbox, thread, reel and search responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BaseUser {
    pub pk: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

impl BaseUser {
    pub fn new(pk: UserId, username: impl Into<String>) -> Self {
        Self {
            pk,
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    /// Name to show in previews: full name when present, username otherwise.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

/// Result of a recipient search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RecipientSearchResult {
    #[serde(default)]
    pub users: Vec<BaseUser>,
    #[serde(default)]
    pub threads: Vec<Thread>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_full_name() {
        let user = BaseUser::new(1, "alice").with_full_name("Alice Liddell");
        assert_eq!(user.display_name(), "Alice Liddell");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let user = BaseUser::new(1, "alice").with_full_name("  ");
        assert_eq!(user.display_name(), "alice");
    }
}
