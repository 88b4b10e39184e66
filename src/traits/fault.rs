//! Reporting of unexpected faults.

use async_trait::async_trait;

/// What to do after the user acknowledged a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    Continue,
    /// State can no longer be trusted; the process should exit.
    Terminate,
}

/// Surfaces a fault to the user and waits for acknowledgment.
#[async_trait]
pub trait FaultReporter: Send + Sync {
    async fn report(&self, message: &str) -> FaultAction;
}
