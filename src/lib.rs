//! Cluster member access synchronization.
//!
//! Keeps a local, transactional record of which application user is a member
//! of which cluster in lockstep with the role bindings that grant that user
//! access inside the remote cluster.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`repository`] | Membership record storage traits and types |
//! | [`rbac`] | Remote role binding client, ownership labels |
//! | [`credentials`] | Credential issuance for new members |
//! | [`members`] | The member synchronizer |
//! | [`events`] | Listener registry for membership events |
//!
//! # Features
//!
//! - `mocks` - in-memory repositories, remote API and credential provisioner
//! - `sqlx_sqlite` - `SQLite` membership store
//! - `kube` - HTTP client for Kubernetes-style RBAC APIs
//! - `tracing` - spans on repository and synchronizer calls

use std::fmt;

pub mod config;
pub mod credentials;
pub mod events;
pub mod members;
pub mod rbac;
pub mod repository;
mod secret;
pub mod validators;

#[cfg(feature = "sqlx_sqlite")]
pub mod sqlite;

pub use config::{AccessConfig, LabelConfig, RemoteConfig, UpdateStrategy};
pub use credentials::{Credential, CredentialProvisioner};
pub use events::{AccessEvent, register_event_listeners};
pub use members::{
    AccessAssignment, Cluster, MemberSummary, MemberSynchronizer, MemberView, NamespaceRoles,
};
pub use rbac::{
    ClusterConnector, ClusterRbacClient, OwnershipLabels, RbacApi, RemoteError, RoleBindingObject,
};
pub use repository::{ClusterBinding, ClusterBindingRepository, CreateClusterBinding, binding_name};
pub use secret::SecretString;
pub use validators::ValidationError;

#[cfg(any(test, feature = "mocks"))]
pub use credentials::MockCredentialProvisioner;
#[cfg(any(test, feature = "mocks"))]
pub use rbac::MockRbacApi;
#[cfg(any(test, feature = "mocks"))]
pub use repository::MockClusterBindingRepository;

#[derive(Debug, Clone, PartialEq)]
pub enum AccessError {
    Validation(ValidationError),
    PermissionDenied(String),
    NotFound,
    AlreadyExists,
    CredentialIssuance(String),
    Remote(RemoteError),
    DatabaseError(String),
    Internal(String),
}

impl std::error::Error for AccessError {}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::Validation(err) => write!(f, "Validation failed: {err}"),
            AccessError::PermissionDenied(msg) => write!(f, "Permission denied: {msg}"),
            AccessError::NotFound => write!(f, "Not found"),
            AccessError::AlreadyExists => write!(f, "Already exists"),
            AccessError::CredentialIssuance(msg) => write!(f, "Credential issuance failed: {msg}"),
            AccessError::Remote(err) => write!(f, "Remote cluster error: {err}"),
            AccessError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            AccessError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl From<ValidationError> for AccessError {
    fn from(err: ValidationError) -> Self {
        AccessError::Validation(err)
    }
}

impl From<RemoteError> for AccessError {
    fn from(err: RemoteError) -> Self {
        AccessError::Remote(err)
    }
}
