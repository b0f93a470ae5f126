//! Remote role binding access.
//!
//! [`RbacApi`] is the raw object API of one cluster; [`ClusterRbacClient`]
//! sits on top of it and only ever sees objects selected by an
//! [`OwnershipLabels`] triple. With the `kube` feature, [`KubeRbacApi`]
//! talks to a Kubernetes-compatible API server over HTTPS.

mod api;
mod client;
mod error;
mod labels;
mod object;

#[cfg(any(test, feature = "mocks"))]
mod mock;

#[cfg(feature = "kube")]
pub mod kube;

pub use api::{ClusterConnector, RbacApi};
pub use client::ClusterRbacClient;
pub use error::RemoteError;
pub use labels::OwnershipLabels;
pub use object::{BindingScope, RoleBindingObject, RoleRef, Subject};

#[cfg(any(test, feature = "mocks"))]
pub use mock::MockRbacApi;

#[cfg(feature = "kube")]
pub use kube::{KubeConnector, KubeEndpoint, KubeRbacApi};
