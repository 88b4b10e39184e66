//! File-backed cache adapter.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::CacheError;
use crate::traits::Cache;

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
        move |source| CacheError::Io {
            key: key.to_string(),
            source,
        }
    }
}

#[async_trait]
impl Cache for FileCache {
    async fn read_value(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(key)(e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CacheError::Serialization {
                key: key.to_string(),
                source,
            })
    }

    async fn write_value(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(Self::io_error(key))?;

        let bytes = serde_json::to_vec_pretty(&value).map_err(|source| CacheError::Serialization {
            key: key.to_string(),
            source,
        })?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(Self::io_error(key))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(Self::io_error(key))?;

        tracing::debug!(key, path = %path.display(), "Cache entry written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ThreadInfo, ThreadInfoMap};
    use crate::traits::CacheExt;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        assert!(cache.read_value("session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_typed_write_then_read() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path().join("nested"));

        let mut map = ThreadInfoMap::new();
        map.insert(
            "42".to_string(),
            ThreadInfo {
                draft: Some("see you".to_string()),
                ..Default::default()
            },
        );
        cache.write("thread_info", &map).await.unwrap();

        let loaded: ThreadInfoMap = cache.read("thread_info").await.unwrap().unwrap();
        assert_eq!(loaded, map);
        assert!(dir.path().join("nested/thread_info.json").exists());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache
            .write_value("session", serde_json::json!({"a": 1}))
            .await
            .unwrap();
        cache.remove("session").await.unwrap();
        cache.remove("session").await.unwrap();
        assert!(cache.read_value("session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("session.json"), b"{not json").unwrap();
        let cache = FileCache::new(dir.path());
        let err = cache.read_value("session").await.unwrap_err();
        assert!(matches!(err, CacheError::Serialization { .. }));
    }
}
