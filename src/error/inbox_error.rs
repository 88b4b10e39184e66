//! Unified error type for inbox synchronization.
//!
//! `InboxError` gathers the leaf errors of the remote client, the cache and the
//! execution contexts, and adds the orchestration-level failures that only make
//! sense above them.

use std::fmt;

use super::category::ErrorCategory;
use super::context::ErrorContext;
use super::local::{CacheError, DispatchError};
use super::remote::RemoteError;

#[derive(Debug)]
pub enum InboxError {
    /// A remote call reported failure.
    Remote(RemoteError),

    /// An authenticated operation was attempted without a logged-in session.
    AuthenticationRequired { operation: &'static str },

    /// The orchestrator has no remote client yet; `initialize` was not called.
    NotInitialized,

    /// The execution context owning the mutation target is gone.
    Dispatch(DispatchError),

    Cache(CacheError),

    /// Fault escaping an operation; may end the process after acknowledgment.
    UnexpectedFault { message: String },

    /// Wrapped error with additional context.
    WithContext {
        error: Box<InboxError>,
        context: ErrorContext,
    },
}

impl InboxError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        InboxError::UnexpectedFault {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            InboxError::Remote(err) => match err {
                RemoteError::Network(_) | RemoteError::Timeout { .. } => ErrorCategory::Network,
                RemoteError::NotAuthenticated => ErrorCategory::Auth,
                RemoteError::Status { status: 401, .. } => ErrorCategory::Auth,
                RemoteError::Status { .. }
                | RemoteError::InvalidResponse(_)
                | RemoteError::Other(_) => ErrorCategory::Server,
            },
            InboxError::AuthenticationRequired { .. } => ErrorCategory::Auth,
            InboxError::NotInitialized | InboxError::Dispatch(_) => ErrorCategory::Client,
            InboxError::Cache(_) => ErrorCategory::System,
            InboxError::UnexpectedFault { .. } => ErrorCategory::Fault,
            InboxError::WithContext { error, .. } => error.category(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            InboxError::Remote(err) => err.is_retryable(),
            InboxError::WithContext { error, .. } => error.is_retryable(),
            _ => false,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        match self {
            InboxError::Remote(err) => err.requires_reauth(),
            InboxError::AuthenticationRequired { .. } => true,
            InboxError::WithContext { error, .. } => error.requires_reauth(),
            _ => false,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            InboxError::Remote(RemoteError::Network(_))
            | InboxError::Remote(RemoteError::Timeout { .. }) => {
                "Couldn't reach the server. Check your connection and try again.".to_string()
            }
            InboxError::Remote(err) if err.requires_reauth() => {
                "Your session has expired. Please sign in again.".to_string()
            }
            InboxError::Remote(err) => format!("The server rejected the request: {}", err),
            InboxError::AuthenticationRequired { operation } => {
                format!("You need to be signed in to {}.", operation.replace('_', " "))
            }
            InboxError::NotInitialized => "The app is still starting up.".to_string(),
            InboxError::Dispatch(_) => "The window this belonged to was closed.".to_string(),
            InboxError::Cache(_) => "Couldn't save or load local data.".to_string(),
            InboxError::UnexpectedFault { message } => {
                format!("Something went wrong: {}", message)
            }
            InboxError::WithContext { error, .. } => error.user_message(),
        }
    }

    /// Short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            InboxError::Remote(err) => err.error_code(),
            InboxError::AuthenticationRequired { .. } => "AUTH_REQUIRED",
            InboxError::NotInitialized => "NOT_INITIALIZED",
            InboxError::Dispatch(_) => "DISPATCH_CLOSED",
            InboxError::Cache(err) => err.error_code(),
            InboxError::UnexpectedFault { .. } => "UNEXPECTED_FAULT",
            InboxError::WithContext { error, .. } => error.error_code(),
        }
    }

    pub fn with_context(self, ctx: ErrorContext) -> Self {
        InboxError::WithContext {
            error: Box::new(self),
            context: ctx,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            InboxError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The innermost error, with every context layer stripped.
    pub fn inner(&self) -> &InboxError {
        match self {
            InboxError::WithContext { error, .. } => error.inner(),
            _ => self,
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }
}

impl fmt::Display for InboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboxError::Remote(err) => write!(f, "remote call failed: {}", err),
            InboxError::AuthenticationRequired { operation } => {
                write!(f, "authentication required for '{}'", operation)
            }
            InboxError::NotInitialized => write!(f, "remote client not initialized"),
            InboxError::Dispatch(err) => write!(f, "{}", err),
            InboxError::Cache(err) => write!(f, "{}", err),
            InboxError::UnexpectedFault { message } => write!(f, "unexpected fault: {}", message),
            InboxError::WithContext { error, context } => write!(f, "{} ({})", error, context),
        }
    }
}

impl std::error::Error for InboxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InboxError::Remote(err) => Some(err),
            InboxError::Dispatch(err) => Some(err),
            InboxError::Cache(err) => Some(err),
            InboxError::WithContext { error, .. } => error.source(),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic error conversion
// ============================================================================

impl From<RemoteError> for InboxError {
    fn from(err: RemoteError) -> Self {
        InboxError::Remote(err)
    }
}

impl From<DispatchError> for InboxError {
    fn from(err: DispatchError) -> Self {
        InboxError::Dispatch(err)
    }
}

impl From<CacheError> for InboxError {
    fn from(err: CacheError) -> Self {
        InboxError::Cache(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_categories() {
        let net: InboxError = RemoteError::Network("reset".into()).into();
        assert_eq!(net.category(), ErrorCategory::Network);
        assert!(net.is_retryable());

        let auth: InboxError = RemoteError::Status {
            status: 401,
            message: "login_required".into(),
        }
        .into();
        assert_eq!(auth.category(), ErrorCategory::Auth);
        assert!(auth.requires_reauth());

        let server: InboxError = RemoteError::InvalidResponse("no threads".into()).into();
        assert_eq!(server.category(), ErrorCategory::Server);
        assert!(!server.is_retryable());
    }

    #[test]
    fn test_local_categories() {
        assert_eq!(InboxError::NotInitialized.category(), ErrorCategory::Client);
        assert_eq!(
            InboxError::AuthenticationRequired { operation: "create_thread" }.category(),
            ErrorCategory::Auth
        );
        assert_eq!(
            InboxError::unexpected("boom").category(),
            ErrorCategory::Fault
        );
        let closed: InboxError = DispatchError::Closed {
            context: "secondary".into(),
        }
        .into();
        assert_eq!(closed.category(), ErrorCategory::Client);
    }

    #[test]
    fn test_with_context_preserves_behaviour() {
        let err: InboxError = RemoteError::Timeout { secs: 10 }.into();
        let err = err.with_context(ErrorContext::new("update_inbox").with_component("inbox"));

        assert_eq!(err.context().map(|c| c.operation.as_str()), Some("update_inbox"));
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "REMOTE_TIMEOUT");
        assert!(matches!(err.inner(), InboxError::Remote(RemoteError::Timeout { .. })));
        assert!(err.to_string().contains("[update_inbox]"));
    }

    #[test]
    fn test_user_messages() {
        let auth = InboxError::AuthenticationRequired {
            operation: "create_thread",
        };
        assert_eq!(auth.user_message(), "You need to be signed in to create thread.");

        let expired: InboxError = RemoteError::NotAuthenticated.into();
        assert!(expired.user_message().contains("sign in"));
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;
        let err: InboxError = RemoteError::Other("x".into()).into();
        assert!(err.source().is_some());
        assert!(InboxError::NotInitialized.source().is_none());
    }
}
