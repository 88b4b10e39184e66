//! Mock implementations for test fixtures.
//!
//! Re-exports the doubles from `inbox_sync::adapters::mock` and bundles the
//! set an orchestrator needs.

pub use inbox_sync::adapters::mock::{
    InMemoryCache, MockRemoteClient, MockRemoteFactory, RecordingFaultReporter, RemoteCall,
};
pub use inbox_sync::traits::{FaultAction, RemoteClient};

/// One of each double, sharing a single remote client.
pub struct MockSet {
    pub remote: MockRemoteClient,
    pub factory: MockRemoteFactory,
    pub cache: InMemoryCache,
    pub faults: RecordingFaultReporter,
}

impl MockSet {
    pub fn new() -> Self {
        let remote = MockRemoteClient::new();
        Self {
            factory: MockRemoteFactory::new(remote.clone()),
            remote,
            cache: InMemoryCache::new(),
            faults: RecordingFaultReporter::new(),
        }
    }
}

impl Default for MockSet {
    fn default() -> Self {
        Self::new()
    }
}
