use chrono::Utc;

use super::phase::{PhaseTracker, SyncPhase};
use super::types::{AccessAssignment, Cluster, MemberSummary, MemberView};
use crate::config::{AccessConfig, UpdateStrategy};
use crate::credentials::CredentialProvisioner;
use crate::events::{AccessEvent, dispatch};
use crate::rbac::{ClusterConnector, ClusterRbacClient};
use crate::repository::{ClusterBindingRepository, CreateClusterBinding};
use crate::validators::{ValidationError, validate_assignment, validate_username};
use crate::AccessError;

/// Keeps membership records and remote role bindings in step.
///
/// The local store is transactional, the remote cluster is not. Every
/// mutating operation keeps the local transaction open while it talks to the
/// cluster and only commits once the remote side succeeded. Remote grants
/// applied before a failure are not retracted; re-running the operation
/// converges because grants are idempotent and revocation sweeps by label.
pub struct MemberSynchronizer<S, C, P> {
    store: S,
    connector: C,
    provisioner: P,
    config: AccessConfig,
}

impl<S, C, P> MemberSynchronizer<S, C, P>
where
    S: ClusterBindingRepository,
    C: ClusterConnector,
    P: CredentialProvisioner,
{
    pub fn new(store: S, connector: C, provisioner: P) -> Self {
        Self::with_config(store, connector, provisioner, AccessConfig::default())
    }

    pub fn with_config(store: S, connector: C, provisioner: P, config: AccessConfig) -> Self {
        Self {
            store,
            connector,
            provisioner,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    fn rbac(&self, cluster: &Cluster) -> Result<ClusterRbacClient<C::Api>, AccessError> {
        let api = self.connector.connect(cluster)?;
        Ok(ClusterRbacClient::new(api, &cluster.uuid, &self.config))
    }

    /// Grants cluster membership to `username` with the given permissions.
    ///
    /// Fails with `AlreadyExists` if the user is already a member, including
    /// when a concurrent add for the same user commits first.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "add_member",
            skip_all,
            fields(cluster = %cluster.name, username = %username),
            err
        )
    )]
    pub async fn add_member(
        &self,
        cluster: &Cluster,
        operator: &str,
        username: &str,
        assignment: AccessAssignment,
    ) -> Result<MemberView, AccessError> {
        ensure_not_creator(cluster, username)?;
        validate_username(username)?;

        let assignment = assignment.normalized();
        if assignment.is_empty() {
            return Err(ValidationError::NoRolesSelected.into());
        }
        validate_assignment(&assignment)?;

        let rbac = self.rbac(cluster)?;
        let mut phases = PhaseTracker::new("add_member", &cluster.name, username);

        let mut tx = self.store.begin().await?;
        if let Err(e) = self
            .apply_add(&rbac, cluster, operator, username, &assignment, &mut tx, &mut phases)
            .await
        {
            self.rollback(tx, &mut phases, &e).await;
            return Err(e);
        }

        if let Err(e) = self.store.commit(tx).await {
            phases.fail(SyncPhase::RolledBack, &e);
            return Err(e);
        }
        phases.advance(SyncPhase::Committed);

        dispatch(AccessEvent::MemberAdded {
            cluster: cluster.name.clone(),
            username: username.to_owned(),
            operator: operator.to_owned(),
            cluster_roles: assignment.cluster_roles.len(),
            namespace_roles: assignment.len() - assignment.cluster_roles.len(),
            at: Utc::now(),
        })
        .await;

        log::info!(
            target: "clusteraccess",
            "msg=\"member added\", cluster=\"{}\", username=\"{username}\", operator=\"{operator}\", grants={}",
            cluster.name,
            assignment.len()
        );

        Ok(MemberView::from_assignment(username, assignment))
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_add(
        &self,
        rbac: &ClusterRbacClient<C::Api>,
        cluster: &Cluster,
        operator: &str,
        username: &str,
        assignment: &AccessAssignment,
        tx: &mut S::Tx,
        phases: &mut PhaseTracker<'_>,
    ) -> Result<(), AccessError> {
        match self
            .store
            .find_by_cluster_and_user(&cluster.name, username, Some(&mut *tx))
            .await
        {
            Ok(_) => return Err(AccessError::AlreadyExists),
            Err(AccessError::NotFound) => {}
            Err(e) => return Err(e),
        }

        phases.advance(SyncPhase::CredentialIssuing);
        let certificate = self.provisioner.issue(cluster, username).await?;

        phases.advance(SyncPhase::RecordPersisting);
        let data = CreateClusterBinding {
            cluster_ref: cluster.name.clone(),
            user_ref: username.to_owned(),
            created_by: operator.to_owned(),
            certificate,
        };
        self.store.create(data, Some(tx)).await?;

        phases.advance(SyncPhase::BindingsApplying);
        apply_grants(rbac, username, assignment).await?;

        Ok(())
    }

    /// Replaces the permissions of an existing member.
    ///
    /// An empty assignment is accepted and leaves the member without grants.
    /// With [`UpdateStrategy::Recreate`] every owned binding is revoked before
    /// the new set is applied, so the member briefly holds no grants;
    /// [`UpdateStrategy::Patch`] only adds what is missing and removes what is
    /// no longer wanted.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "update_member",
            skip_all,
            fields(cluster = %cluster.name, username = %username),
            err
        )
    )]
    pub async fn update_member(
        &self,
        cluster: &Cluster,
        operator: &str,
        username: &str,
        assignment: AccessAssignment,
    ) -> Result<MemberView, AccessError> {
        ensure_not_creator(cluster, username)?;
        validate_username(username)?;

        let desired = assignment.normalized();
        validate_assignment(&desired)?;

        self.store
            .find_by_cluster_and_user(&cluster.name, username, None)
            .await?;
        let rbac = self.rbac(cluster)?;
        let mut phases = PhaseTracker::new("update_member", &cluster.name, username);

        phases.advance(SyncPhase::RemoteRevoking);
        let (to_grant, to_revoke) = match self.plan_update(&rbac, username, &desired).await {
            Ok(plan) => plan,
            Err(e) => {
                phases.fail(SyncPhase::Failed, &e);
                return Err(e);
            }
        };

        let mut tx = self.store.begin().await?;
        if let Err(e) = self
            .apply_update(&rbac, &cluster.name, username, &to_grant, &to_revoke, &mut tx, &mut phases)
            .await
        {
            self.rollback(tx, &mut phases, &e).await;
            return Err(e);
        }

        if let Err(e) = self.store.commit(tx).await {
            phases.fail(SyncPhase::Failed, &e);
            return Err(e);
        }
        phases.advance(SyncPhase::Committed);

        dispatch(AccessEvent::MemberUpdated {
            cluster: cluster.name.clone(),
            username: username.to_owned(),
            operator: operator.to_owned(),
            granted: to_grant.len(),
            revoked: to_revoke.len(),
            at: Utc::now(),
        })
        .await;

        log::info!(
            target: "clusteraccess",
            "msg=\"member updated\", cluster=\"{}\", username=\"{username}\", operator=\"{operator}\", strategy=\"{:?}\", granted={}, revoked={}",
            cluster.name,
            self.config.update_strategy,
            to_grant.len(),
            to_revoke.len()
        );

        Ok(MemberView::from_assignment(username, desired))
    }

    /// Returns `(to_grant, to_revoke)` for the configured strategy.
    async fn plan_update(
        &self,
        rbac: &ClusterRbacClient<C::Api>,
        username: &str,
        desired: &AccessAssignment,
    ) -> Result<(AccessAssignment, AccessAssignment), AccessError> {
        match self.config.update_strategy {
            UpdateStrategy::Recreate => {
                let revoked = rbac.revoke_all(username).await?;
                log::debug!(
                    target: "clusteraccess",
                    "msg=\"owned bindings revoked\", username=\"{username}\", count={revoked}"
                );
                Ok((desired.clone(), AccessAssignment::new()))
            }
            UpdateStrategy::Patch => {
                let current = rbac.list_owned_bindings(username).await?;
                Ok((desired.difference(&current), current.difference(desired)))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_update(
        &self,
        rbac: &ClusterRbacClient<C::Api>,
        cluster_name: &str,
        username: &str,
        to_grant: &AccessAssignment,
        to_revoke: &AccessAssignment,
        tx: &mut S::Tx,
        phases: &mut PhaseTracker<'_>,
    ) -> Result<(), AccessError> {
        phases.advance(SyncPhase::RecordTouching);
        self.store.touch(cluster_name, username, Some(tx)).await?;

        phases.advance(SyncPhase::BindingsReapplying);
        apply_grants(rbac, username, to_grant).await?;
        for (namespace, role) in to_revoke.grants() {
            rbac.revoke(namespace, role, username).await?;
        }

        Ok(())
    }

    /// Removes a member.
    ///
    /// The local record is deleted and committed first. Revoking the remote
    /// bindings happens afterwards; if that fails the error is logged and
    /// reported as [`AccessEvent::RemoteCleanupFailed`], and the call still
    /// succeeds.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "delete_member",
            skip_all,
            fields(cluster = %cluster.name, username = %username),
            err
        )
    )]
    pub async fn delete_member(
        &self,
        cluster: &Cluster,
        operator: &str,
        username: &str,
    ) -> Result<(), AccessError> {
        ensure_not_creator(cluster, username)?;
        validate_username(username)?;

        self.store
            .find_by_cluster_and_user(&cluster.name, username, None)
            .await?;

        let mut tx = self.store.begin().await?;
        if let Err(e) = self.store.delete(&cluster.name, username, Some(&mut tx)).await {
            if let Err(rollback_error) = self.store.rollback(tx).await {
                log::error!(target: "clusteraccess", "msg=\"rollback failed\", error=\"{rollback_error}\"");
            }
            return Err(e);
        }
        self.store.commit(tx).await?;

        dispatch(AccessEvent::MemberRemoved {
            cluster: cluster.name.clone(),
            username: username.to_owned(),
            operator: operator.to_owned(),
            at: Utc::now(),
        })
        .await;

        log::info!(
            target: "clusteraccess",
            "msg=\"member removed\", cluster=\"{}\", username=\"{username}\", operator=\"{operator}\"",
            cluster.name
        );

        self.cleanup_remote(cluster, username).await;

        Ok(())
    }

    async fn cleanup_remote(&self, cluster: &Cluster, username: &str) {
        let result = match self.rbac(cluster) {
            Ok(rbac) => rbac.revoke_all(username).await.map_err(AccessError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(count) => log::debug!(
                target: "clusteraccess",
                "msg=\"remote bindings removed\", cluster=\"{}\", username=\"{username}\", count={count}",
                cluster.name
            ),
            Err(e) => {
                log::warn!(
                    target: "clusteraccess",
                    "msg=\"remote cleanup incomplete\", cluster=\"{}\", username=\"{username}\", error=\"{e}\"",
                    cluster.name
                );
                dispatch(AccessEvent::RemoteCleanupFailed {
                    cluster: cluster.name.clone(),
                    username: username.to_owned(),
                    reason: e.to_string(),
                    at: Utc::now(),
                })
                .await;
            }
        }
    }

    /// Live view of a member's grants, read from the cluster.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "get_member",
            skip_all,
            fields(cluster = %cluster.name, username = %username),
            err
        )
    )]
    pub async fn get_member(&self, cluster: &Cluster, username: &str) -> Result<MemberView, AccessError> {
        self.store
            .find_by_cluster_and_user(&cluster.name, username, None)
            .await?;

        let current = self.rbac(cluster)?.list_owned_bindings(username).await?;
        Ok(MemberView::from_assignment(username, current))
    }

    /// Members of `cluster` from local records only.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "list_members", skip_all, fields(cluster = %cluster.name), err)
    )]
    pub async fn list_members(&self, cluster: &Cluster) -> Result<Vec<MemberSummary>, AccessError> {
        match self.store.find_by_cluster(&cluster.name, None).await {
            Ok(bindings) => Ok(bindings.into_iter().map(MemberSummary::from).collect()),
            Err(AccessError::NotFound) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn rollback(&self, tx: S::Tx, phases: &mut PhaseTracker<'_>, error: &AccessError) {
        if let Err(e) = self.store.rollback(tx).await {
            log::error!(target: "clusteraccess", "msg=\"rollback failed\", error=\"{e}\"");
        }
        let terminal = match phases.current() {
            SyncPhase::RecordTouching | SyncPhase::BindingsReapplying => SyncPhase::Failed,
            _ => SyncPhase::RolledBack,
        };
        phases.fail(terminal, error);
    }
}

fn ensure_not_creator(cluster: &Cluster, username: &str) -> Result<(), AccessError> {
    if cluster.is_creator(username) {
        return Err(AccessError::PermissionDenied(format!(
            "{username} registered cluster {} and cannot be changed as a member",
            cluster.name
        )));
    }
    Ok(())
}

async fn apply_grants<A: crate::rbac::RbacApi>(
    rbac: &ClusterRbacClient<A>,
    username: &str,
    assignment: &AccessAssignment,
) -> Result<(), AccessError> {
    for (namespace, role) in assignment.grants() {
        rbac.grant(namespace, role, username, false).await?;
    }
    Ok(())
}
