//! Cluster membership management.
//!
//! [`MemberSynchronizer`] is the entry point: it adds, updates, removes and
//! reads members of a [`Cluster`], keeping the local [`ClusterBinding`]
//! records and the remote role bindings in step.
//!
//! # Example
//!
//! ```rust,ignore
//! use clusteraccess::{AccessAssignment, Cluster, MemberSynchronizer};
//!
//! let sync = MemberSynchronizer::new(store, connector, provisioner);
//! let cluster = Cluster::new("prod", cluster_uuid, "admin");
//!
//! let assignment = AccessAssignment::new()
//!     .with_cluster_role("view")
//!     .with_namespace_role("payments", "edit");
//! let view = sync.add_member(&cluster, "admin", "alice", assignment).await?;
//! ```
//!
//! [`ClusterBinding`]: crate::repository::ClusterBinding

mod phase;
mod synchronizer;
mod types;

pub use phase::SyncPhase;
pub use synchronizer::MemberSynchronizer;
pub use types::{AccessAssignment, Cluster, MemberSummary, MemberView, NamespaceRoles};
