//! Ownership-aware role binding client.

use chrono::Utc;
use sha2::{Digest, Sha256};

use super::api::RbacApi;
use super::error::RemoteError;
use super::labels::OwnershipLabels;
use super::object::{BindingScope, RoleBindingObject};
use crate::config::{AccessConfig, LabelConfig};
use crate::members::AccessAssignment;

/// Translates role grants into owned binding objects in one cluster.
///
/// Every object it creates carries the ownership label triple for the
/// cluster and user; every object it reads or deletes is selected by, and
/// re-checked against, that triple. Calls are never retried.
pub struct ClusterRbacClient<A> {
    api: A,
    cluster_id: String,
    labels: LabelConfig,
    name_prefix: String,
}

impl<A: RbacApi> ClusterRbacClient<A> {
    pub fn new(api: A, cluster_id: impl Into<String>, config: &AccessConfig) -> Self {
        Self {
            api,
            cluster_id: cluster_id.into(),
            labels: config.labels.clone(),
            name_prefix: config.binding_name_prefix.clone(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn owner(&self, username: &str) -> OwnershipLabels {
        OwnershipLabels::new(&self.labels, &self.cluster_id, username)
    }

    /// Object name for a grant: `{prefix}:{username}:{role}:{digest}`.
    ///
    /// Role names may contain `:`, so the readable part alone can be shared
    /// by two grants; the digest over the length-prefixed username and the
    /// role tells them apart.
    pub fn object_name(&self, username: &str, role: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update((username.len() as u64).to_be_bytes());
        hasher.update(username.as_bytes());
        hasher.update(role.as_bytes());
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(10);

        format!("{}:{}:{}:{}", self.name_prefix, username, role, digest)
    }

    fn desired_object(&self, namespace: Option<&str>, role: &str, username: &str) -> RoleBindingObject {
        let mut object = RoleBindingObject::for_user(
            self.object_name(username, role),
            BindingScope::from_namespace(namespace),
            role,
            username,
        );
        object.labels = self.owner(username).to_labels();
        object
            .annotations
            .insert("created-at".to_owned(), Utc::now().to_rfc3339());
        object
    }

    async fn owned_in_scope(
        &self,
        scope: &BindingScope,
        owner: &OwnershipLabels,
    ) -> Result<Vec<RoleBindingObject>, RemoteError> {
        let objects = match scope {
            BindingScope::Cluster => self.api.list_cluster_role_bindings(owner).await?,
            BindingScope::Namespace(_) => self.api.list_role_bindings(owner).await?,
        };

        Ok(objects
            .into_iter()
            .filter(|o| &o.scope == scope && owner.is_owned(&o.labels))
            .collect())
    }

    async fn find_owned(
        &self,
        object: &RoleBindingObject,
        owner: &OwnershipLabels,
    ) -> Result<Option<RoleBindingObject>, RemoteError> {
        Ok(self
            .owned_in_scope(&object.scope, owner)
            .await?
            .into_iter()
            .find(|o| o.name == object.name))
    }

    /// Current grants of `username`, read live from the cluster.
    ///
    /// Role names are deduplicated; an empty result is an empty assignment.
    pub async fn list_owned_bindings(&self, username: &str) -> Result<AccessAssignment, RemoteError> {
        let owner = self.owner(username);
        let mut current = AccessAssignment::new();

        for object in self.api.list_cluster_role_bindings(&owner).await? {
            if owner.is_owned(&object.labels) && object.scope == BindingScope::Cluster {
                current.cluster_roles.insert(object.role_ref.name);
            }
        }

        for object in self.api.list_role_bindings(&owner).await? {
            if !owner.is_owned(&object.labels) {
                continue;
            }
            if let BindingScope::Namespace(namespace) = object.scope {
                current
                    .namespace_roles
                    .entry(namespace)
                    .or_default()
                    .insert(object.role_ref.name);
            }
        }

        Ok(current)
    }

    /// Grants `role` to `username`, cluster-wide when `namespace` is `None`.
    ///
    /// Calling this twice with the same arguments is a no-op the second time.
    /// With `overwrite`, an existing owned object is replaced. An object of
    /// the same name that is not owned is left alone and reported as
    /// `RemoteError::Conflict`.
    pub async fn grant(
        &self,
        namespace: Option<&str>,
        role: &str,
        username: &str,
        overwrite: bool,
    ) -> Result<(), RemoteError> {
        let owner = self.owner(username);
        let desired = self.desired_object(namespace, role, username);

        if self.find_owned(&desired, &owner).await?.is_some() {
            if overwrite {
                self.api.replace(&desired).await?;
                log::debug!(target: "clusteraccess", "msg=\"binding replaced\", binding=\"{}\", namespace=\"{}\"", desired.name, namespace.unwrap_or_default());
            }
            return Ok(());
        }

        match self.api.create(&desired).await {
            Ok(()) => {
                log::debug!(target: "clusteraccess", "msg=\"binding created\", binding=\"{}\", namespace=\"{}\"", desired.name, namespace.unwrap_or_default());
                Ok(())
            }
            Err(RemoteError::AlreadyExists(name)) => {
                // a concurrent or earlier partial apply may have created it
                if self.find_owned(&desired, &owner).await?.is_some() {
                    Ok(())
                } else {
                    Err(RemoteError::Conflict(name))
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Removes one owned grant. A grant that is already gone is not an error.
    pub async fn revoke(
        &self,
        namespace: Option<&str>,
        role: &str,
        username: &str,
    ) -> Result<(), RemoteError> {
        let owner = self.owner(username);
        let scope = BindingScope::from_namespace(namespace);
        let name = self.object_name(username, role);

        match self.api.delete(&scope, &name, &owner).await {
            Ok(()) | Err(RemoteError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Deletes every owned binding of `username`, cluster- and namespace-scoped.
    ///
    /// Every match is attempted even when some deletions fail; failures are
    /// collected into `RemoteError::Incomplete`. Returns how many objects were
    /// deleted.
    pub async fn revoke_all(&self, username: &str) -> Result<usize, RemoteError> {
        let owner = self.owner(username);
        let mut errors = Vec::new();
        let mut targets = Vec::new();

        match self.api.list_cluster_role_bindings(&owner).await {
            Ok(objects) => targets.extend(objects),
            Err(e) => errors.push(e),
        }
        match self.api.list_role_bindings(&owner).await {
            Ok(objects) => targets.extend(objects),
            Err(e) => errors.push(e),
        }

        let mut deleted = 0;
        for object in targets.iter().filter(|o| owner.is_owned(&o.labels)) {
            match self.api.delete(&object.scope, &object.name, &owner).await {
                Ok(()) => deleted += 1,
                Err(RemoteError::NotFound(_)) => {}
                Err(e) => {
                    log::warn!(target: "clusteraccess", "msg=\"binding delete failed\", binding=\"{}\", username=\"{username}\", error=\"{e}\"", object.name);
                    errors.push(e);
                }
            }
        }

        if errors.is_empty() {
            Ok(deleted)
        } else {
            Err(RemoteError::Incomplete(errors))
        }
    }
}
