//! Error category classification.
//!
//! Categories drive the propagation policy: background reconciliation swallows
//! transient categories and waits for the next cycle, foreground actions hand
//! the category to the caller for feedback.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, timeout or transport failure talking to the remote side.
    /// Transient; the next refresh cycle usually recovers.
    Network,

    /// The remote side rejected the request or returned something unusable.
    Server,

    /// Operation requires an authenticated session.
    Auth,

    /// Local invariant violated or context torn down (programming error or shutdown).
    Client,

    /// Local storage failure (cache read/write).
    System,

    /// Unexpected fault escaping a background operation.
    Fault,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Short label suitable for structured logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Client => "client",
            ErrorCategory::System => "system",
            ErrorCategory::Fault => "fault",
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check your internet connection; the inbox refreshes automatically",
            ErrorCategory::Server => "The service may be having issues. Please try again later",
            ErrorCategory::Auth => "Please sign in again",
            ErrorCategory::Client => "This may be a bug. Please report it if it persists",
            ErrorCategory::System => "Check file permissions and available disk space",
            ErrorCategory::Fault => "The application may need to restart",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
