//! Membership record storage.
//!
//! This module defines the storage abstraction for cluster membership
//! records. Implement [`ClusterBindingRepository`] to use your own database,
//! or enable `sqlx_sqlite` for the bundled `SQLite` backend.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ClusterBindingRepository`] | Transactional membership record store |
//! | [`ClusterBinding`] | A (cluster, user) membership record |
//! | [`CreateClusterBinding`] | Input for creating a record |
//!
//! Enable the `mocks` feature for [`MockClusterBindingRepository`], an
//! in-memory store with buffered transactions.

mod binding;

#[cfg(any(test, feature = "mocks"))]
mod binding_mock;

pub use binding::{ClusterBinding, ClusterBindingRepository, CreateClusterBinding, binding_name};

#[cfg(any(test, feature = "mocks"))]
pub use binding_mock::{MockBindingTx, MockClusterBindingRepository};
