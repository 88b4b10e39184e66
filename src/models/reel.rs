use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_id, BaseUser};
use crate::collection::Reconcilable;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

/// One story item inside a reel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StoryItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub expiring_at: Option<DateTime<Utc>>,
}

/// A story-tray entry grouping one publisher's story items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Reel {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, alias = "user")]
    pub owner: BaseUser,
    /// Timestamp of the newest story in the reel
    #[serde(default)]
    pub latest_reel_media: Option<i64>,
    /// Timestamp of the newest story the viewer has seen
    #[serde(default)]
    pub seen: Option<i64>,
    #[serde(default)]
    pub expiring_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<StoryItem>,
    #[serde(default)]
    pub muted: bool,
}

impl Reel {
    pub fn new(id: impl Into<String>, owner: BaseUser) -> Self {
        Self {
            id: id.into(),
            owner,
            ..Default::default()
        }
    }

    /// Whether the reel has stories newer than the last one seen.
    pub fn has_unseen(&self) -> bool {
        match (self.latest_reel_media, self.seen) {
            (Some(latest), Some(seen)) => latest > seen,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

impl Reconcilable for Reel {
    type Key = String;

    fn identity(&self) -> String {
        self.id.clone()
    }

    /// Full shallow property copy; the reel is never diffed field by field.
    fn absorb(&mut self, source: &Self) -> bool {
        if self == source {
            return false;
        }
        *self = source.clone();
        true
    }
}
