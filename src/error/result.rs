//! Result alias and context helpers.

use super::context::ErrorContext;
use super::inbox_error::InboxError;

pub type InboxResult<T> = Result<T, InboxError>;

/// Extension trait for attaching an [`ErrorContext`] to a failing result.
pub trait ResultExt<T> {
    fn context(self, ctx: ErrorContext) -> InboxResult<T>;

    /// Add context using a closure (only called on error).
    fn with_context<F>(self, f: F) -> InboxResult<T>
    where
        F: FnOnce() -> ErrorContext;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<InboxError>,
{
    fn context(self, ctx: ErrorContext) -> InboxResult<T> {
        self.map_err(|e| Into::<InboxError>::into(e).with_context(ctx))
    }

    fn with_context<F>(self, f: F) -> InboxResult<T>
    where
        F: FnOnce() -> ErrorContext,
    {
        self.map_err(|e| Into::<InboxError>::into(e).with_context(f()))
    }
}
