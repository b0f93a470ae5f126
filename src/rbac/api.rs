use async_trait::async_trait;

use super::error::RemoteError;
use super::labels::OwnershipLabels;
use super::object::{BindingScope, RoleBindingObject};
use crate::AccessError;
use crate::members::Cluster;

/// Raw access to a remote cluster's role binding objects.
///
/// Reads and deletes always take an [`OwnershipLabels`] value; implementations
/// must only return or delete objects carrying all three labels.
#[async_trait]
pub trait RbacApi: Send + Sync {
    /// Cluster-scoped bindings owned by `owner`.
    async fn list_cluster_role_bindings(
        &self,
        owner: &OwnershipLabels,
    ) -> Result<Vec<RoleBindingObject>, RemoteError>;

    /// Namespace-scoped bindings owned by `owner`, across all namespaces.
    async fn list_role_bindings(
        &self,
        owner: &OwnershipLabels,
    ) -> Result<Vec<RoleBindingObject>, RemoteError>;

    /// Fails with `RemoteError::AlreadyExists` when the name is taken.
    async fn create(&self, binding: &RoleBindingObject) -> Result<(), RemoteError>;

    async fn replace(&self, binding: &RoleBindingObject) -> Result<(), RemoteError>;

    /// Fails with `RemoteError::NotFound` when no owned object has this name.
    async fn delete(
        &self,
        scope: &BindingScope,
        name: &str,
        owner: &OwnershipLabels,
    ) -> Result<(), RemoteError>;
}

/// Opens an [`RbacApi`] for a cluster handle.
pub trait ClusterConnector: Send + Sync {
    type Api: RbacApi;

    /// Returns `AccessError::NotFound` when the cluster is unknown.
    fn connect(&self, cluster: &Cluster) -> Result<Self::Api, AccessError>;
}
