//! Fault reporter that records what it was asked to show.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::lock;
use crate::traits::{FaultAction, FaultReporter};

#[derive(Debug, Clone)]
pub struct RecordingFaultReporter {
    reports: Arc<Mutex<Vec<String>>>,
    action: Arc<Mutex<FaultAction>>,
}

impl RecordingFaultReporter {
    pub fn new() -> Self {
        Self {
            reports: Arc::new(Mutex::new(Vec::new())),
            action: Arc::new(Mutex::new(FaultAction::Continue)),
        }
    }

    /// Action returned by every later report.
    pub fn set_action(&self, action: FaultAction) {
        *lock(&self.action) = action;
    }

    pub fn reports(&self) -> Vec<String> {
        lock(&self.reports).clone()
    }
}

impl Default for RecordingFaultReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaultReporter for RecordingFaultReporter {
    async fn report(&self, message: &str) -> FaultAction {
        lock(&self.reports).push(message.to_string());
        *lock(&self.action)
    }
}
