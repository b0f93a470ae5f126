//! End-to-end tests for the member synchronizer over in-memory backends.
//!
//! Run with: `cargo test --features mocks --test e2e_members`

#![cfg(feature = "mocks")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clusteraccess::events::{AccessEvent, Listener};
use clusteraccess::rbac::BindingScope;
use clusteraccess::{
    AccessAssignment, AccessConfig, AccessError, Cluster, ClusterRbacClient, LabelConfig,
    MemberSynchronizer, MockClusterBindingRepository, MockCredentialProvisioner, MockRbacApi,
    RoleBindingObject, UpdateStrategy, ValidationError, binding_name, register_event_listeners,
};

type Synchronizer =
    MemberSynchronizer<MockClusterBindingRepository, MockRbacApi, MockCredentialProvisioner>;

struct Recorder(Arc<Mutex<Vec<AccessEvent>>>);

#[async_trait]
impl Listener for Recorder {
    async fn handle(&self, event: &AccessEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

fn setup(config: AccessConfig) -> (Synchronizer, MockRbacApi, MockCredentialProvisioner) {
    let api = MockRbacApi::new();
    let provisioner = MockCredentialProvisioner::new();
    let sync = MemberSynchronizer::with_config(
        MockClusterBindingRepository::new(),
        api.clone(),
        provisioner.clone(),
        config,
    );
    (sync, api, provisioner)
}

fn cluster() -> Cluster {
    Cluster::new("edge-eu", "0d9a7c2e-edge-eu", "importer")
}

#[tokio::test]
async fn test_member_lifecycle() {
    let (sync, api, _) = setup(AccessConfig::default());
    let cluster = cluster();

    let assignment = AccessAssignment::new()
        .with_cluster_role("view")
        .with_namespace_role("payments", "edit")
        .with_namespace_role("payments", "view");

    let added = sync
        .add_member(&cluster, "importer", "alice", assignment.clone())
        .await
        .unwrap();
    assert_eq!(added.username, "alice");
    assert_eq!(api.objects().len(), 3);

    let members = sync.list_members(&cluster).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].binding_name, binding_name("edge-eu", "alice"));
    assert_eq!(members[0].created_by, "importer");

    let read = sync.get_member(&cluster, "alice").await.unwrap();
    assert_eq!(read.to_assignment(), assignment);

    let reduced = AccessAssignment::new().with_namespace_role("payments", "view");
    sync.update_member(&cluster, "importer", "alice", reduced.clone())
        .await
        .unwrap();
    assert_eq!(
        sync.get_member(&cluster, "alice").await.unwrap().to_assignment(),
        reduced
    );

    sync.delete_member(&cluster, "importer", "alice").await.unwrap();
    assert!(sync.list_members(&cluster).await.unwrap().is_empty());
    assert!(api.objects().is_empty());
}

#[tokio::test]
async fn test_bindings_carry_ownership_labels() {
    let (sync, api, _) = setup(AccessConfig::default());

    sync.add_member(
        &cluster(),
        "importer",
        "alice",
        AccessAssignment::new().with_namespace_role("payments", "edit"),
    )
    .await
    .unwrap();

    let objects = api.objects();
    assert_eq!(objects.len(), 1);

    let object = &objects[0];
    assert!(object.name.starts_with("clusteraccess:alice:edit:"));
    assert_eq!(object.scope, BindingScope::Namespace("payments".to_owned()));
    assert_eq!(object.role_ref.kind, "ClusterRole");
    assert_eq!(object.subjects[0].name, "alice");
    assert_eq!(object.labels["clusteraccess-manage"], "clusteraccess");
    assert_eq!(object.labels["clusteraccess-cluster-id"], "0d9a7c2e-edge-eu");
    assert_eq!(object.labels["clusteraccess-username"], "alice");
}

#[tokio::test]
async fn test_custom_labels_and_prefix() {
    let config = AccessConfig {
        labels: LabelConfig {
            manage_key: "portal/managed".to_owned(),
            manage_value: "ops-portal".to_owned(),
            cluster_id_key: "portal/cluster".to_owned(),
            username_key: "portal/user".to_owned(),
        },
        binding_name_prefix: "ops-portal".to_owned(),
        ..Default::default()
    };
    let (sync, api, _) = setup(config);

    sync.add_member(
        &cluster(),
        "importer",
        "alice",
        AccessAssignment::new().with_cluster_role("view"),
    )
    .await
    .unwrap();

    let object = &api.objects()[0];
    assert!(object.name.starts_with("ops-portal:alice:view:"));
    assert_eq!(object.labels["portal/managed"], "ops-portal");
    assert_eq!(
        sync.get_member(&cluster(), "alice").await.unwrap().cluster_roles.len(),
        1
    );
}

#[tokio::test]
async fn test_foreign_bindings_are_invisible_and_kept() {
    let (sync, api, _) = setup(AccessConfig::default());

    // created by hand inside the cluster, no ownership labels
    api.insert(RoleBindingObject::for_user(
        "alice-break-glass".to_owned(),
        BindingScope::Cluster,
        "cluster-admin",
        "alice",
    ));

    sync.add_member(
        &cluster(),
        "importer",
        "alice",
        AccessAssignment::new().with_cluster_role("view"),
    )
    .await
    .unwrap();

    let read = sync.get_member(&cluster(), "alice").await.unwrap();
    assert_eq!(read.cluster_roles.len(), 1);
    assert!(read.cluster_roles.contains("view"));

    sync.delete_member(&cluster(), "importer", "alice").await.unwrap();

    let remaining = api.objects();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "alice-break-glass");
}

#[tokio::test]
async fn test_name_collision_with_foreign_object_fails_add() {
    let (sync, api, _) = setup(AccessConfig::default());
    let client = ClusterRbacClient::new(api.clone(), "0d9a7c2e-edge-eu", &AccessConfig::default());

    api.insert(RoleBindingObject::for_user(
        client.object_name("alice", "view"),
        BindingScope::Cluster,
        "cluster-admin",
        "mallory",
    ));

    let result = sync
        .add_member(
            &cluster(),
            "importer",
            "alice",
            AccessAssignment::new().with_cluster_role("view"),
        )
        .await;

    assert!(matches!(result, Err(AccessError::Remote(_))));
    assert!(sync.list_members(&cluster()).await.unwrap().is_empty());
    assert_eq!(api.objects()[0].subjects[0].name, "mallory");
}

#[tokio::test]
async fn test_invalid_names_rejected_before_side_effects() {
    let (sync, api, provisioner) = setup(AccessConfig::default());

    let result = sync
        .add_member(
            &cluster(),
            "importer",
            "alice",
            AccessAssignment::new().with_namespace_role("Payments Team", "edit"),
        )
        .await;
    assert_eq!(
        result.unwrap_err(),
        AccessError::Validation(ValidationError::NamespaceInvalidFormat)
    );

    let result = sync
        .add_member(
            &cluster(),
            "importer",
            "alice@example.com",
            AccessAssignment::new().with_cluster_role("view"),
        )
        .await;
    assert_eq!(
        result.unwrap_err(),
        AccessError::Validation(ValidationError::UsernameInvalidFormat)
    );

    let result = sync
        .add_member(
            &cluster(),
            "importer",
            "team/alice",
            AccessAssignment::new().with_cluster_role("view"),
        )
        .await;
    assert_eq!(
        result.unwrap_err(),
        AccessError::Validation(ValidationError::UsernameInvalidFormat)
    );

    assert!(api.objects().is_empty());
    assert!(provisioner.issued.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_roles_sharing_a_readable_name() {
    let (sync, api, _) = setup(AccessConfig::default());

    sync.add_member(
        &cluster(),
        "importer",
        "dev",
        AccessAssignment::new()
            .with_cluster_role("ops:view")
            .with_cluster_role("system:aggregate-to-edit"),
    )
    .await
    .unwrap();
    sync.add_member(
        &cluster(),
        "importer",
        "dev-ops",
        AccessAssignment::new().with_cluster_role("view"),
    )
    .await
    .unwrap();

    assert_eq!(api.objects().len(), 3);
    assert_eq!(
        sync.get_member(&cluster(), "dev").await.unwrap().cluster_roles.len(),
        2
    );
}

#[tokio::test]
async fn test_patch_and_recreate_agree() {
    let start = AccessAssignment::new()
        .with_cluster_role("view")
        .with_namespace_role("payments", "edit");
    let next = AccessAssignment::new()
        .with_cluster_role("view")
        .with_namespace_role("payments", "view")
        .with_namespace_role("ledger", "view");

    let mut reads = Vec::new();
    for strategy in [UpdateStrategy::Recreate, UpdateStrategy::Patch] {
        let (sync, _, _) = setup(AccessConfig {
            update_strategy: strategy,
            ..Default::default()
        });
        sync.add_member(&cluster(), "importer", "alice", start.clone())
            .await
            .unwrap();
        sync.update_member(&cluster(), "importer", "alice", next.clone())
            .await
            .unwrap();
        reads.push(sync.get_member(&cluster(), "alice").await.unwrap());
    }

    assert_eq!(reads[0], reads[1]);
    assert_eq!(reads[0].to_assignment(), next);
}

// the only test in this binary that registers listeners; the registry is
// process-wide and accepts a single registration
#[tokio::test]
async fn test_events_dispatched() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorder = Recorder(Arc::clone(&events));
    register_event_listeners(|registry| {
        registry.listen(recorder);
    });

    let (sync, api, _) = setup(AccessConfig::default());
    let cluster = Cluster::new("events-only", "events-uuid", "importer");

    sync.add_member(
        &cluster,
        "importer",
        "carol",
        AccessAssignment::new().with_cluster_role("view"),
    )
    .await
    .unwrap();

    api.set_unreachable(true);
    sync.delete_member(&cluster, "importer", "carol").await.unwrap();

    let names: Vec<&str> = events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.cluster() == "events-only")
        .map(AccessEvent::name)
        .collect();
    assert_eq!(
        names,
        vec!["member.added", "member.removed", "member.remote_cleanup_failed"]
    );
}
