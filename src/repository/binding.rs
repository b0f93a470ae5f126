use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AccessError;
use crate::credentials::Credential;

/// Derives the membership record identifier for a (cluster, user) pair.
///
/// The identifier is a pure function of its inputs and distinct per user
/// within one cluster. It is not unique across clusters (`prod-eu`/`ops` and
/// `prod`/`eu-ops` share one), so stores key records by the pair itself.
pub fn binding_name(cluster: &str, username: &str) -> String {
    format!("{cluster}-{username}-cluster-binding")
}

/// Local record proving that a user is a member of a cluster.
///
/// The record says nothing about which roles are granted: those live only in
/// the remote cluster as owned role bindings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBinding {
    /// Deterministic identifier, see [`binding_name`].
    pub name: String,
    pub cluster_ref: String,
    pub user_ref: String,
    /// Operator who added the member.
    pub created_by: String,
    /// Credential issued for the member at creation time.
    #[serde(skip_serializing)]
    pub certificate: Credential,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateClusterBinding {
    pub cluster_ref: String,
    pub user_ref: String,
    pub created_by: String,
    pub certificate: Credential,
}

impl CreateClusterBinding {
    pub fn name(&self) -> String {
        binding_name(&self.cluster_ref, &self.user_ref)
    }
}

/// Transactional storage of cluster membership records.
///
/// Every data operation takes an optional transaction so callers can compose
/// local writes with remote side effects and decide afterwards whether to
/// commit or roll back. Passing `None` runs the operation on its own.
///
/// Records are keyed by `(cluster_ref, user_ref)`. `find_by_cluster_and_user`,
/// `find_by_cluster` and `touch` report missing data as
/// `AccessError::NotFound`; duplicate records are `AccessError::AlreadyExists`.
#[async_trait]
pub trait ClusterBindingRepository: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, AccessError>;
    async fn commit(&self, tx: Self::Tx) -> Result<(), AccessError>;
    async fn rollback(&self, tx: Self::Tx) -> Result<(), AccessError>;

    async fn create(
        &self,
        data: CreateClusterBinding,
        tx: Option<&mut Self::Tx>,
    ) -> Result<ClusterBinding, AccessError>;
    async fn find_by_cluster_and_user(
        &self,
        cluster: &str,
        username: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<ClusterBinding, AccessError>;
    async fn find_by_cluster(
        &self,
        cluster: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<Vec<ClusterBinding>, AccessError>;
    /// Bumps `updated_at` on an existing record.
    async fn touch(
        &self,
        cluster: &str,
        username: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<ClusterBinding, AccessError>;
    async fn delete(
        &self,
        cluster: &str,
        username: &str,
        tx: Option<&mut Self::Tx>,
    ) -> Result<(), AccessError>;
}

#[cfg(any(test, feature = "mocks"))]
impl ClusterBinding {
    pub fn mock(cluster: &str, username: &str) -> Self {
        let now = Utc::now();
        ClusterBinding {
            name: binding_name(cluster, username),
            cluster_ref: cluster.to_owned(),
            user_ref: username.to_owned(),
            created_by: "admin".to_owned(),
            certificate: Credential::new(b"mock-certificate".to_vec()),
            created_at: now,
            updated_at: now,
        }
    }
}
