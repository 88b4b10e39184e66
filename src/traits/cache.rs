//! Persistent key/value cache abstraction.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheError;

/// Storage for state that must survive a restart (session, per-thread metadata).
///
/// Values are opaque JSON documents; use [`CacheExt`] for typed access.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    async fn read_value(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    async fn write_value(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Typed helpers over [`Cache`].
#[async_trait]
pub trait CacheExt {
    async fn read<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned + Send;

    async fn write<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize + Sync;
}

#[async_trait]
impl<C> CacheExt for C
where
    C: Cache + ?Sized,
{
    async fn read<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned + Send,
    {
        match self.read_value(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| CacheError::Serialization {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    async fn write<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(value).map_err(|source| CacheError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.write_value(key, value).await
    }
}
