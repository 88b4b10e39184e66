//! Failures reported by the remote client collaborator.

use thiserror::Error;

/// A remote call did not produce a usable result.
///
/// Returned as a value by every [`RemoteClient`](crate::traits::RemoteClient)
/// method; never raised across the API boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Network(_) | RemoteError::Timeout { .. } => true,
            RemoteError::Status { status, .. } => *status >= 500 || *status == 429,
            RemoteError::NotAuthenticated
            | RemoteError::InvalidResponse(_)
            | RemoteError::Other(_) => false,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            RemoteError::NotAuthenticated | RemoteError::Status { status: 401, .. }
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RemoteError::Network(_) => "REMOTE_NETWORK",
            RemoteError::Timeout { .. } => "REMOTE_TIMEOUT",
            RemoteError::Status { .. } => "REMOTE_STATUS",
            RemoteError::NotAuthenticated => "REMOTE_NOT_AUTHENTICATED",
            RemoteError::InvalidResponse(_) => "REMOTE_INVALID_RESPONSE",
            RemoteError::Other(_) => "REMOTE_OTHER",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(RemoteError::Network("reset".into()).is_retryable());
        assert!(RemoteError::Timeout { secs: 30 }.is_retryable());
        assert!(RemoteError::Status {
            status: 503,
            message: "busy".into()
        }
        .is_retryable());
        assert!(!RemoteError::Status {
            status: 404,
            message: "gone".into()
        }
        .is_retryable());
        assert!(!RemoteError::NotAuthenticated.is_retryable());
    }

    #[test]
    fn test_requires_reauth() {
        assert!(RemoteError::NotAuthenticated.requires_reauth());
        assert!(RemoteError::Status {
            status: 401,
            message: "login_required".into()
        }
        .requires_reauth());
        assert!(!RemoteError::Network("x".into()).requires_reauth());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            RemoteError::Status {
                status: 500,
                message: "oops".into()
            }
            .to_string(),
            "server returned 500: oops"
        );
        assert_eq!(RemoteError::NotAuthenticated.to_string(), "not authenticated");
    }
}
