//! Inbox Sync - reconciliation engine for a direct-messaging desktop client
//!
//! Merges server snapshots of conversation threads and story reels into live,
//! observable collections without losing identity or selection.

pub mod adapters;
pub mod collection;
pub mod config;
pub mod debouncer;
pub mod dispatch;
pub mod error;
pub mod inbox;
pub mod logging;
pub mod models;
pub mod presence;
pub mod reels;
pub mod registry;
pub mod session;
pub mod traits;

pub use config::{StaleSelectionPolicy, SyncConfig};
pub use error::{InboxError, InboxResult};
pub use inbox::{InboxEvent, InboxReconciler, Selection, ThreadWrapper};
pub use reels::{RefreshOutcome, ReelSyncEngine};
pub use session::SessionOrchestrator;
