//! Session lifecycle and the operations the presentation layer calls directly.
//!
//! [`SessionOrchestrator`] owns one of each engine, the swappable remote
//! client slot and the per-thread metadata map, and wires them together on
//! login and logout.

mod orchestrator;
mod search;

pub use orchestrator::SessionOrchestrator;

/// Cache key of the persisted [`SessionData`](crate::models::SessionData).
pub const SESSION_KEY: &str = "session";

/// Cache key of the persisted [`ThreadInfoMap`](crate::models::ThreadInfoMap).
pub const THREAD_INFO_KEY: &str = "thread_info";

/// Debounce key shared by both search entry points.
pub const SEARCH_DEBOUNCE_KEY: &str = "ThreadSearch";

/// Shown by [`SessionOrchestrator::report_fault`] when no message is given.
pub const DEFAULT_FAULT_MESSAGE: &str = "An unexpected error has occurred and the inbox may be \
     out of date. If this keeps happening, please restart and report the problem.";
