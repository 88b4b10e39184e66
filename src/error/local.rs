//! Errors raised by local collaborators: execution contexts and the cache.

use thiserror::Error;

/// The owning execution context of a collection is gone.
///
/// Happens when a secondary view was closed while a fetch for it was in flight.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("execution context '{context}' is closed")]
    Closed { context: String },
}

/// Local cache failures.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cache entry '{key}' could not be (de)serialized: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no cache directory available")]
    NoDataDirectory,
}

impl CacheError {
    pub fn error_code(&self) -> &'static str {
        match self {
            CacheError::Io { .. } => "CACHE_IO",
            CacheError::Serialization { .. } => "CACHE_SERDE",
            CacheError::NoDataDirectory => "CACHE_NO_DIR",
        }
    }
}
