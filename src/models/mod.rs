mod presence;
mod reel;
mod session;
mod thread;
mod user;

pub use presence::PresenceValue;
pub use reel::{MediaType, Reel, StoryItem};
pub use session::{LoginOutcome, SessionData, ThreadInfo, ThreadInfoMap};
pub use thread::*;
pub use user::{BaseUser, RecipientSearchResult, UserId};

use serde::{Deserialize, Deserializer};

/// Helper to deserialize an id sent either as a string or as an integer.
///
/// The remote side is inconsistent about thread and item ids; both forms
/// are normalised to `String`.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer id")
        }

        fn visit_str<E>(self, value: &str) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_unit<E>(self) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}
