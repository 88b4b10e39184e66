//! In-memory cache for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::lock;
use crate::error::CacheError;
use crate::traits::Cache;

#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    write_should_fail: Arc<Mutex<bool>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure whether writes fail with an I/O error.
    pub fn set_write_should_fail(&self, should_fail: bool) {
        *lock(&self.write_should_fail) = should_fail;
    }

    /// Raw stored value (for assertions).
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        lock(&self.entries).get(key).cloned()
    }

    /// Seed a raw value (for test setup).
    pub fn insert(&self, key: &str, value: serde_json::Value) {
        lock(&self.entries).insert(key.to_string(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).contains_key(key)
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn read_value(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        Ok(self.get(key))
    }

    async fn write_value(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        if *lock(&self.write_should_fail) {
            return Err(CacheError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "mock write failure"),
            });
        }
        self.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}
