//! Collaborator traits.
//!
//! The engines never talk to the network, disk or the user directly; they go
//! through these traits so that tests can substitute the doubles in
//! [`crate::adapters::mock`].
//!
//! # Traits
//!
//! - [`RemoteClient`] - the direct-messaging protocol client
//! - [`RemoteClientFactory`] - builds a client around a session
//! - [`SharedRemote`] - the swappable slot engines read the current client from
//! - [`Cache`] / [`CacheExt`] - persistent key/value storage for local state
//! - [`FaultReporter`] - surfaces unexpected faults to the user

pub mod cache;
pub mod fault;
pub mod remote;

pub use cache::{Cache, CacheExt};
pub use fault::{FaultAction, FaultReporter};
pub use remote::{RemoteClient, RemoteClientFactory, SharedRemote};
