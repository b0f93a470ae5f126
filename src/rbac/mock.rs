#![allow(clippy::significant_drop_tightening)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::api::{ClusterConnector, RbacApi};
use super::error::RemoteError;
use super::labels::OwnershipLabels;
use super::object::{BindingScope, RoleBindingObject};
use crate::AccessError;
use crate::members::Cluster;

/// In-memory stand-in for a cluster's role binding API.
///
/// Clones share state, so a test can keep a handle while the synchronizer
/// owns another. It also acts as a [`ClusterConnector`] that hands out such
/// clones for any cluster; ownership labels keep clusters apart.
#[derive(Clone, Default)]
pub struct MockRbacApi {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    objects: Vec<RoleBindingObject>,
    failing_roles: HashSet<String>,
    fail_deletes: bool,
    unreachable: bool,
}

impl MockRbacApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MockState>, RemoteError> {
        self.state
            .lock()
            .map_err(|_| RemoteError::Unreachable("lock poisoned".into()))
    }

    /// Stores an object as-is, bypassing ownership checks.
    pub fn insert(&self, object: RoleBindingObject) {
        if let Ok(mut state) = self.state() {
            state.objects.push(object);
        }
    }

    /// Snapshot of every stored object, owned or not.
    pub fn objects(&self) -> Vec<RoleBindingObject> {
        self.state().map(|s| s.objects.clone()).unwrap_or_default()
    }

    /// Makes creating a binding for `role` fail with an API error.
    pub fn fail_grants_for_role(&self, role: &str) {
        if let Ok(mut state) = self.state() {
            state.failing_roles.insert(role.to_owned());
        }
    }

    pub fn fail_deletes(&self, fail: bool) {
        if let Ok(mut state) = self.state() {
            state.fail_deletes = fail;
        }
    }

    /// Makes every call fail as if the API server were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        if let Ok(mut state) = self.state() {
            state.unreachable = unreachable;
        }
    }

    fn reachable(&self) -> Result<MutexGuard<'_, MockState>, RemoteError> {
        let state = self.state()?;
        if state.unreachable {
            return Err(RemoteError::Unreachable("connection refused".into()));
        }
        Ok(state)
    }

    fn list(
        &self,
        owner: &OwnershipLabels,
        cluster_scoped: bool,
    ) -> Result<Vec<RoleBindingObject>, RemoteError> {
        let state = self.reachable()?;
        Ok(state
            .objects
            .iter()
            .filter(|o| (o.scope == BindingScope::Cluster) == cluster_scoped)
            .filter(|o| owner.is_owned(&o.labels))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RbacApi for MockRbacApi {
    async fn list_cluster_role_bindings(
        &self,
        owner: &OwnershipLabels,
    ) -> Result<Vec<RoleBindingObject>, RemoteError> {
        self.list(owner, true)
    }

    async fn list_role_bindings(
        &self,
        owner: &OwnershipLabels,
    ) -> Result<Vec<RoleBindingObject>, RemoteError> {
        self.list(owner, false)
    }

    async fn create(&self, binding: &RoleBindingObject) -> Result<(), RemoteError> {
        let mut state = self.reachable()?;

        if state.failing_roles.contains(&binding.role_ref.name) {
            return Err(RemoteError::Api {
                status: 500,
                message: format!("injected failure for role {}", binding.role_ref.name),
            });
        }

        if state
            .objects
            .iter()
            .any(|o| o.scope == binding.scope && o.name == binding.name)
        {
            return Err(RemoteError::AlreadyExists(binding.name.clone()));
        }

        state.objects.push(binding.clone());
        Ok(())
    }

    async fn replace(&self, binding: &RoleBindingObject) -> Result<(), RemoteError> {
        let mut state = self.reachable()?;

        let existing = state
            .objects
            .iter_mut()
            .find(|o| o.scope == binding.scope && o.name == binding.name)
            .ok_or_else(|| RemoteError::NotFound(binding.name.clone()))?;
        *existing = binding.clone();

        Ok(())
    }

    async fn delete(
        &self,
        scope: &BindingScope,
        name: &str,
        owner: &OwnershipLabels,
    ) -> Result<(), RemoteError> {
        let mut state = self.reachable()?;

        if state.fail_deletes {
            return Err(RemoteError::PermissionDenied(format!(
                "cannot delete binding {name}"
            )));
        }

        let position = state
            .objects
            .iter()
            .position(|o| &o.scope == scope && o.name == name && owner.is_owned(&o.labels))
            .ok_or_else(|| RemoteError::NotFound(name.to_owned()))?;
        state.objects.remove(position);

        Ok(())
    }
}

impl ClusterConnector for MockRbacApi {
    type Api = MockRbacApi;

    fn connect(&self, _cluster: &Cluster) -> Result<Self::Api, AccessError> {
        Ok(self.clone())
    }
}
