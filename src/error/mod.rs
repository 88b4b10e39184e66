//! Error handling for inbox synchronization.
//!
//! - **Leaf errors**: [`RemoteError`] from the remote client, [`CacheError`]
//!   from local persistence, [`DispatchError`] from execution contexts
//! - **Unified error**: [`InboxError`] adds orchestration failures and a
//!   category for handling decisions
//! - **Context**: [`ErrorContext`] attached through [`ResultExt`]
//!
//! # Propagation
//!
//! | Path | Policy |
//! |------|--------|
//! | Periodic refresh, presence, push | Logged and swallowed; next cycle recovers |
//! | Login, send, create thread | Returned as `InboxResult` to the caller |
//! | Unexpected fault | Routed to the `FaultReporter`, which may end the process |

mod category;
mod context;
mod inbox_error;
mod local;
mod remote;
mod result;

pub use category::ErrorCategory;
pub use context::ErrorContext;
pub use inbox_error::InboxError;
pub use local::{CacheError, DispatchError};
pub use remote::RemoteError;
pub use result::{InboxResult, ResultExt};
