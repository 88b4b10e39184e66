//! Fault reporter that only logs.

use async_trait::async_trait;

use crate::traits::{FaultAction, FaultReporter};

/// Logs every fault at error level and answers with a fixed action.
///
/// Used by headless runs where there is no one to acknowledge a dialog.
#[derive(Debug, Clone)]
pub struct LogFaultReporter {
    action: FaultAction,
}

impl LogFaultReporter {
    pub fn new() -> Self {
        Self {
            action: FaultAction::Continue,
        }
    }

    pub fn terminating() -> Self {
        Self {
            action: FaultAction::Terminate,
        }
    }
}

impl Default for LogFaultReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaultReporter for LogFaultReporter {
    async fn report(&self, message: &str) -> FaultAction {
        tracing::error!(action = ?self.action, "Unexpected fault: {}", message);
        self.action
    }
}
