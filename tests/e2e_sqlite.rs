// these tests use #[serial] to run sequentially because setup_db() recreates
// the in-memory database for every test.

//! End-to-end tests for the `SQLite` membership store.
//!
//! Run with: `cargo test --features sqlx_sqlite,mocks --test e2e_sqlite`

#![cfg(all(feature = "sqlx_sqlite", feature = "mocks"))]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use clusteraccess::sqlite::{SqliteClusterBindingRepository, migrations};
use clusteraccess::{
    AccessAssignment, AccessError, Cluster, ClusterBindingRepository, CreateClusterBinding,
    Credential, MemberSynchronizer, MockCredentialProvisioner, MockRbacApi,
};
use serial_test::serial;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

async fn setup_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory SQLite database");

    migrations::run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

fn create_data(cluster: &str, username: &str) -> CreateClusterBinding {
    CreateClusterBinding {
        cluster_ref: cluster.to_owned(),
        user_ref: username.to_owned(),
        created_by: "importer".to_owned(),
        certificate: Credential::new(b"-----BEGIN CERTIFICATE-----".to_vec()),
    }
}

fn cluster() -> Cluster {
    Cluster::new("prod", "7e1d2f80-prod", "importer")
}

#[tokio::test]
#[serial]
async fn test_binding_repository_crud() {
    let pool = setup_db().await;
    let repo = SqliteClusterBindingRepository::new(pool);

    let created = repo
        .create(create_data("prod", "alice"), None)
        .await
        .expect("Failed to create binding");
    assert_eq!(created.name, "prod-alice-cluster-binding");

    let found = repo
        .find_by_cluster_and_user("prod", "alice", None)
        .await
        .expect("Failed to find binding");
    assert_eq!(found.name, created.name);
    assert_eq!(found.created_by, "importer");
    assert_eq!(found.certificate, created.certificate);

    let touched = repo.touch("prod", "alice", None).await.expect("Failed to touch");
    assert!(touched.updated_at >= created.updated_at);

    repo.create(create_data("prod", "bob"), None).await.unwrap();
    repo.create(create_data("staging", "alice"), None).await.unwrap();
    assert_eq!(repo.find_by_cluster("prod", None).await.unwrap().len(), 2);

    repo.delete("prod", "alice", None).await.expect("Failed to delete");
    assert_eq!(
        repo.find_by_cluster_and_user("prod", "alice", None)
            .await
            .unwrap_err(),
        AccessError::NotFound
    );
}

#[tokio::test]
#[serial]
async fn test_missing_records_are_not_found() {
    let pool = setup_db().await;
    let repo = SqliteClusterBindingRepository::new(pool);

    assert_eq!(
        repo.find_by_cluster_and_user("prod", "nobody", None)
            .await
            .unwrap_err(),
        AccessError::NotFound
    );
    assert_eq!(
        repo.find_by_cluster("prod", None).await.unwrap_err(),
        AccessError::NotFound
    );
    assert_eq!(
        repo.touch("prod", "nobody", None)
            .await
            .unwrap_err(),
        AccessError::NotFound
    );
}

#[tokio::test]
#[serial]
async fn test_duplicate_binding_rejected() {
    let pool = setup_db().await;
    let repo = SqliteClusterBindingRepository::new(pool);

    repo.create(create_data("prod", "alice"), None).await.unwrap();
    let result = repo.create(create_data("prod", "alice"), None).await;

    assert_eq!(result.unwrap_err(), AccessError::AlreadyExists);
}

#[tokio::test]
#[serial]
async fn test_same_identifier_on_different_clusters() {
    let pool = setup_db().await;
    let repo = SqliteClusterBindingRepository::new(pool.clone());

    let first = repo.create(create_data("prod-eu", "ops"), None).await.unwrap();
    let second = repo.create(create_data("prod", "eu-ops"), None).await.unwrap();
    assert_eq!(first.name, second.name);

    repo.delete("prod", "eu-ops", None).await.unwrap();
    assert!(repo.find_by_cluster_and_user("prod-eu", "ops", None).await.is_ok());

    let sync = MemberSynchronizer::new(repo, MockRbacApi::new(), MockCredentialProvisioner::new());
    let prod_eu = Cluster::new("prod-eu", "c3d1-prod-eu", "importer");
    let assignment = AccessAssignment::new().with_cluster_role("view");

    sync.add_member(&cluster(), "importer", "eu-ops", assignment.clone())
        .await
        .unwrap();
    sync.update_member(&cluster(), "importer", "eu-ops", assignment.clone())
        .await
        .unwrap();

    assert_eq!(sync.list_members(&prod_eu).await.unwrap()[0].name, "ops");
    assert_eq!(sync.list_members(&cluster()).await.unwrap()[0].name, "eu-ops");
}

#[tokio::test]
#[serial]
async fn test_transaction_rollback() {
    let pool = setup_db().await;
    let repo = SqliteClusterBindingRepository::new(pool);

    let mut tx = repo.begin().await.unwrap();
    repo.create(create_data("prod", "alice"), Some(&mut tx))
        .await
        .unwrap();
    assert!(
        repo.find_by_cluster_and_user("prod", "alice", Some(&mut tx))
            .await
            .is_ok()
    );
    repo.rollback(tx).await.unwrap();

    assert_eq!(
        repo.find_by_cluster_and_user("prod", "alice", None)
            .await
            .unwrap_err(),
        AccessError::NotFound
    );
}

#[tokio::test]
#[serial]
async fn test_migrations_are_idempotent() {
    let pool = setup_db().await;
    migrations::run(&pool).await.expect("Second run failed");

    let repo = SqliteClusterBindingRepository::new(pool);
    repo.create(create_data("prod", "alice"), None).await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_synchronizer_with_sqlite() {
    let pool = setup_db().await;
    let api = MockRbacApi::new();
    let sync = MemberSynchronizer::new(
        SqliteClusterBindingRepository::new(pool),
        api.clone(),
        MockCredentialProvisioner::new(),
    );

    let assignment = AccessAssignment::new()
        .with_cluster_role("view")
        .with_namespace_role("dev", "edit");
    sync.add_member(&cluster(), "importer", "alice", assignment.clone())
        .await
        .unwrap();

    let read = sync.get_member(&cluster(), "alice").await.unwrap();
    assert_eq!(read.to_assignment(), assignment);

    let members = sync.list_members(&cluster()).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].name, "alice");

    sync.delete_member(&cluster(), "importer", "alice").await.unwrap();
    assert!(sync.list_members(&cluster()).await.unwrap().is_empty());
    assert!(api.objects().is_empty());
}

#[tokio::test]
#[serial]
async fn test_failed_grant_rolls_back_sqlite_record() {
    let pool = setup_db().await;
    let api = MockRbacApi::new();
    api.fail_grants_for_role("edit");
    let sync = MemberSynchronizer::new(
        SqliteClusterBindingRepository::new(pool),
        api,
        MockCredentialProvisioner::new(),
    );

    let result = sync
        .add_member(
            &cluster(),
            "importer",
            "alice",
            AccessAssignment::new().with_namespace_role("dev", "edit"),
        )
        .await;

    assert!(matches!(result, Err(AccessError::Remote(_))));
    assert!(sync.list_members(&cluster()).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_concurrent_adds_one_commits() {
    let pool = setup_db().await;
    let sync = MemberSynchronizer::new(
        SqliteClusterBindingRepository::new(pool),
        MockRbacApi::new(),
        MockCredentialProvisioner::new(),
    );
    let cluster = cluster();
    let assignment = AccessAssignment::new().with_cluster_role("view");

    let (first, second) = tokio::join!(
        sync.add_member(&cluster, "importer", "alice", assignment.clone()),
        sync.add_member(&cluster, "importer", "alice", assignment.clone()),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| r.as_ref().err() == Some(&AccessError::AlreadyExists))
    );
    assert_eq!(sync.list_members(&cluster).await.unwrap().len(), 1);
}
