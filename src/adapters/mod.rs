//! Concrete implementations of the collaborator traits.
//!
//! # Adapters
//!
//! - [`FileCache`] - JSON files under the data directory
//! - [`FixtureRemote`] - remote client serving recorded snapshots from disk
//! - [`LogFaultReporter`] - logs faults instead of showing a dialog
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides scriptable test doubles:
//! - [`mock::MockRemoteClient`] / [`mock::MockRemoteFactory`]
//! - [`mock::InMemoryCache`]
//! - [`mock::RecordingFaultReporter`]

pub mod file_cache;
pub mod fixture_remote;
pub mod log_fault;
pub mod mock;

pub use file_cache::FileCache;
pub use fixture_remote::{FixtureRemote, FixtureRemoteFactory};
pub use log_fault::LogFaultReporter;
pub use mock::{InMemoryCache, MockRemoteClient, MockRemoteFactory, RecordingFaultReporter};
