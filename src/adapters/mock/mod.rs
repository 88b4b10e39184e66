//! Test doubles for the collaborator traits.
//!
//! All doubles are cheap to clone and share their state, so a test can keep one
//! handle for scripting and assertions while the code under test owns another.
//!
//! # Available Mocks
//!
//! - [`MockRemoteClient`] - scripted responses, failure switches, call log
//! - [`MockRemoteFactory`] - hands out clients sharing one [`MockRemoteClient`]
//! - [`InMemoryCache`] - in-memory key/value storage
//! - [`RecordingFaultReporter`] - records reported faults

pub mod cache;
pub mod fault;
pub mod remote;

pub use cache::InMemoryCache;
pub use fault::RecordingFaultReporter;
pub use remote::{MockRemoteClient, MockRemoteFactory, RemoteCall};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mock's state, ignoring poisoning from a panicked test thread.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
