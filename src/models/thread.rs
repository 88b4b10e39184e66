use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_id, BaseUser, UserId};
use crate::collection::Reconcilable;

/// Kind of a direct message item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    #[default]
    Text,
    Media,
    Link,
    Like,
    ReelShare,
    StoryShare,
    ActionLog,
    /// Anything this client does not render specially
    #[serde(other)]
    Unknown,
}

/// A single message item inside a thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DirectItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub item_id: String,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub item_type: ItemType,
    /// Text body; also used as the preview line for placeholder threads
    #[serde(default)]
    pub text: Option<String>,
}

impl DirectItem {
    pub fn text(item_id: impl Into<String>, user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            user_id,
            timestamp: Utc::now(),
            item_type: ItemType::Text,
            text: Some(text.into()),
        }
    }
}

/// Identity of a thread inside a collection.
///
/// Canonical threads are identified by their server-assigned id. Placeholder
/// threads (not yet created remotely) are identified by their participant set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThreadKey {
    Id(String),
    Participants(Vec<UserId>),
}

/// A conversation between a set of participants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Thread {
    /// Server-assigned id; empty for a placeholder thread
    #[serde(default, deserialize_with = "deserialize_id")]
    pub thread_id: String,
    #[serde(default, alias = "thread_title")]
    pub title: String,
    #[serde(default)]
    pub users: Vec<BaseUser>,
    #[serde(default)]
    pub last_permanent_item: Option<DirectItem>,
    /// Most recent page of items, oldest first
    #[serde(default)]
    pub items: Vec<DirectItem>,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub has_older: bool,
    #[serde(default)]
    pub oldest_cursor: Option<String>,
    #[serde(default)]
    pub last_seen_item_id: Option<String>,
}

impl Thread {
    pub fn new(thread_id: impl Into<String>, users: Vec<BaseUser>) -> Self {
        let is_group = users.len() > 1;
        Self {
            thread_id: thread_id.into(),
            users,
            is_group,
            ..Default::default()
        }
    }

    /// A thread that does not exist remotely yet, identified by its participants.
    pub fn placeholder(users: Vec<BaseUser>) -> Self {
        Self::new(String::new(), users)
    }

    /// Single-user direct placeholder.
    pub fn direct_with(user: BaseUser) -> Self {
        let mut thread = Self::placeholder(vec![user]);
        thread.title = thread.users[0].username.clone();
        thread
    }

    pub fn is_placeholder(&self) -> bool {
        self.thread_id.is_empty()
    }

    pub fn participant_ids(&self) -> Vec<UserId> {
        self.users.iter().map(|u| u.pk).collect()
    }

    pub fn key(&self) -> ThreadKey {
        if self.thread_id.is_empty() {
            let mut ids = self.participant_ids();
            ids.sort_unstable();
            ids.dedup();
            ThreadKey::Participants(ids)
        } else {
            ThreadKey::Id(self.thread_id.clone())
        }
    }

    /// Newest item known for this thread.
    pub fn latest_item(&self) -> Option<&DirectItem> {
        self.items
            .iter()
            .max_by_key(|item| item.timestamp)
            .or(self.last_permanent_item.as_ref())
    }

    /// Whether the newest known item has been marked seen locally.
    pub fn is_latest_item_seen(&self) -> bool {
        match (self.latest_item(), &self.last_seen_item_id) {
            (Some(latest), Some(seen)) => &latest.item_id == seen,
            (None, _) => true,
            _ => false,
        }
    }

    /// Overwrite the preview line used by search results.
    ///
    /// One participant shows their name, several show a participant count.
    pub fn decorate_search_preview(&mut self) {
        let text = if self.users.len() == 1 {
            self.users[0].full_name.clone()
        } else {
            format!("{} participants", self.users.len())
        };
        self.last_permanent_item
            .get_or_insert_with(DirectItem::default)
            .text = Some(text);
    }

    /// Merge a freshly fetched copy of this thread into `self`, in place.
    ///
    /// Scalar fields are overwritten. Items are merged by `item_id`: known items
    /// are updated, new ones inserted, and items older than the fetched page are
    /// kept. Returns `true` when anything changed.
    pub fn merge_from(&mut self, source: &Thread) -> bool {
        let before = self.clone();

        if !source.thread_id.is_empty() {
            self.thread_id = source.thread_id.clone();
        }
        self.title = source.title.clone();
        self.users = source.users.clone();
        self.last_permanent_item = source.last_permanent_item.clone();
        self.last_activity_at = source.last_activity_at;
        self.is_group = source.is_group;
        self.muted = source.muted;
        self.has_older = source.has_older;
        self.oldest_cursor = source.oldest_cursor.clone();
        if source.last_seen_item_id.is_some() {
            self.last_seen_item_id = source.last_seen_item_id.clone();
        }

        for item in &source.items {
            match self.items.iter_mut().find(|i| i.item_id == item.item_id) {
                Some(existing) => *existing = item.clone(),
                None => self.items.push(item.clone()),
            }
        }
        self.items.sort_by_key(|item| item.timestamp);

        *self != before
    }
}

impl Reconcilable for Thread {
    type Key = ThreadKey;

    fn identity(&self) -> ThreadKey {
        self.key()
    }

    fn absorb(&mut self, source: &Self) -> bool {
        self.merge_from(source)
    }
}

/// One page of the inbox listing, newest threads first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InboxPage {
    #[serde(default)]
    pub threads: Vec<Thread>,
    #[serde(default)]
    pub oldest_cursor: Option<String>,
    #[serde(default)]
    pub has_older: bool,
    #[serde(default)]
    pub unseen_count: u32,
}
