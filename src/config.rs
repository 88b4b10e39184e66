//! Engine configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable overriding the cache directory.
pub const DATA_DIR_ENV: &str = "INBOX_SYNC_DATA_DIR";
/// Environment variable selecting the stale selection policy (`keep` / `clear`).
pub const STALE_SELECTION_ENV: &str = "INBOX_SYNC_STALE_SELECTION";
/// Environment variable overriding the reel refresh interval, in seconds.
pub const REEL_INTERVAL_ENV: &str = "INBOX_SYNC_REEL_INTERVAL_SECS";

/// What to do with the selection when a refresh no longer contains the selected thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleSelectionPolicy {
    /// Keep pointing at the last known copy of the thread (detached).
    #[default]
    Keep,
    /// Drop the selection.
    Clear,
}

impl FromStr for StaleSelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(StaleSelectionPolicy::Keep),
            "clear" => Ok(StaleSelectionPolicy::Clear),
            other => Err(format!("unknown stale selection policy '{}'", other)),
        }
    }
}

/// Tunables for the sync engines.
///
/// Use the builder methods to customize.
///
/// # Example
///
/// ```ignore
/// use inbox_sync::SyncConfig;
///
/// let config = SyncConfig::default()
///     .with_reel_cooldown(Duration::from_secs(5))
///     .with_stale_selection(StaleSelectionPolicy::Clear);
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay between two periodic reel refreshes (default: 5 minutes)
    pub reel_refresh_interval: Duration,
    /// Minimum time after a successful reel refresh before the next one fetches (default: 10s)
    pub reel_cooldown: Duration,
    /// Quiet period before a search query is sent (default: 500ms)
    pub search_debounce: Duration,
    /// Longer queries are ignored (default: 50 characters)
    pub search_max_query_len: usize,
    /// Pages fetched when refreshing a single thread (default: 1)
    pub thread_page_limit: u32,
    pub stale_selection: StaleSelectionPolicy,
    /// Directory for the persistent cache
    pub data_dir: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reel_refresh_interval: Duration::from_secs(5 * 60),
            reel_cooldown: Duration::from_secs(10),
            search_debounce: Duration::from_millis(500),
            search_max_query_len: 50,
            thread_page_limit: 1,
            stale_selection: StaleSelectionPolicy::Keep,
            data_dir: default_data_dir(),
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reel_refresh_interval(mut self, interval: Duration) -> Self {
        self.reel_refresh_interval = interval;
        self
    }

    pub fn with_reel_cooldown(mut self, cooldown: Duration) -> Self {
        self.reel_cooldown = cooldown;
        self
    }

    pub fn with_search_debounce(mut self, delay: Duration) -> Self {
        self.search_debounce = delay;
        self
    }

    pub fn with_search_max_query_len(mut self, len: usize) -> Self {
        self.search_max_query_len = len;
        self
    }

    pub fn with_thread_page_limit(mut self, pages: u32) -> Self {
        self.thread_page_limit = pages.max(1);
        self
    }

    pub fn with_stale_selection(mut self, policy: StaleSelectionPolicy) -> Self {
        self.stale_selection = policy;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Defaults overridden by `INBOX_SYNC_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        if let Ok(value) = std::env::var(STALE_SELECTION_ENV) {
            match value.parse() {
                Ok(policy) => config.stale_selection = policy,
                Err(e) => tracing::warn!(var = STALE_SELECTION_ENV, "Ignoring: {}", e),
            }
        }

        if let Ok(value) = std::env::var(REEL_INTERVAL_ENV) {
            match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.reel_refresh_interval = Duration::from_secs(secs),
                _ => tracing::warn!(var = REEL_INTERVAL_ENV, value = %value, "Ignoring invalid interval"),
            }
        }

        config
    }
}

/// `<platform data dir>/inbox-sync`, or `./.inbox-sync` when there is none.
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("inbox-sync"))
        .unwrap_or_else(|| PathBuf::from(".inbox-sync"))
}
