//! Context attached to errors for logging.

use chrono::{DateTime, Utc};

/// Where and when an error occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    /// Operation that failed, e.g. `"update_inbox"`.
    pub operation: String,

    /// Thread the operation was acting on, if any.
    pub thread_id: Option<String>,

    /// Component that raised the error.
    pub component: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            thread_id: None,
            component: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.operation)?;

        if let Some(ref component) = self.component {
            write!(f, " component={}", component)?;
        }

        if let Some(ref thread_id) = self.thread_id {
            write!(f, " thread={}", thread_id)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let ctx = ErrorContext::new("update_thread")
            .with_thread_id("340282")
            .with_component("inbox");

        assert_eq!(ctx.operation, "update_thread");
        assert_eq!(ctx.thread_id.as_deref(), Some("340282"));
        assert_eq!(ctx.component.as_deref(), Some("inbox"));
    }

    #[test]
    fn test_context_display() {
        let display = ErrorContext::new("refresh").with_thread_id("t1").to_string();
        assert!(display.contains("[refresh]"));
        assert!(display.contains("thread=t1"));

        let minimal = ErrorContext::new("refresh").to_string();
        assert!(!minimal.contains("thread="));
    }
}
