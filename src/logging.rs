//! Tracing subscriber setup.

use std::env;

use tracing_subscriber::EnvFilter;

/// Filter used when neither environment variable is set.
pub const DEFAULT_FILTER: &str = "info,inbox_sync=debug";

/// Application-specific filter variable, consulted after `RUST_LOG`.
pub const LOG_ENV: &str = "INBOX_SYNC_LOG";

/// Install the global subscriber.
///
/// Precedence:
/// 1) `RUST_LOG`
/// 2) `INBOX_SYNC_LOG`
/// 3) [`DEFAULT_FILTER`]
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_names(true)
        .with_env_filter(filter_from_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn filter_from_env() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    if let Some(filter) = env::var(LOG_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
    {
        return filter;
    }

    EnvFilter::new(DEFAULT_FILTER)
}
