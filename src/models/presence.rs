use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last known presence of a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PresenceValue {
    Online,
    Offline {
        #[serde(default)]
        last_activity_at: Option<DateTime<Utc>>,
    },
    Typing {
        thread_id: String,
    },
}

impl PresenceValue {
    pub fn is_active(&self) -> bool {
        !matches!(self, PresenceValue::Offline { .. })
    }
}

impl Default for PresenceValue {
    fn default() -> Self {
        PresenceValue::Offline {
            last_activity_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_serde_tagged() {
        let typing: PresenceValue =
            serde_json::from_str(r#"{"state":"typing","thread_id":"12"}"#).unwrap();
        assert_eq!(
            typing,
            PresenceValue::Typing {
                thread_id: "12".to_string()
            }
        );
        assert!(typing.is_active());

        let offline: PresenceValue = serde_json::from_str(r#"{"state":"offline"}"#).unwrap();
        assert_eq!(offline, PresenceValue::default());
        assert!(!offline.is_active());
    }
}
