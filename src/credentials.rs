//! Credential issuance for cluster members.
//!
//! When a member is added, the synchronizer asks a [`CredentialProvisioner`]
//! for a credential the member can present to the remote cluster API (for
//! Kubernetes, a client certificate signed by the cluster CA). The bytes are
//! opaque to this crate: they are stored with the membership record and
//! never logged.

use std::fmt;

use async_trait::async_trait;

use crate::AccessError;
use crate::members::Cluster;

/// Opaque credential bytes issued for a member.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Vec<u8>);

impl Credential {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential([REDACTED; {} bytes])", self.0.len())
    }
}

impl From<Vec<u8>> for Credential {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Issues cluster credentials for usernames.
///
/// Implementations return `AccessError::CredentialIssuance` on failure.
#[async_trait]
pub trait CredentialProvisioner: Send + Sync {
    async fn issue(&self, cluster: &Cluster, username: &str) -> Result<Credential, AccessError>;
}

#[cfg(any(test, feature = "mocks"))]
pub use mock::MockCredentialProvisioner;

#[cfg(any(test, feature = "mocks"))]
mod mock {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{Credential, CredentialProvisioner};
    use crate::AccessError;
    use crate::members::Cluster;

    /// Provisioner returning deterministic fake certificates.
    ///
    /// Usernames registered with [`fail_for`](Self::fail_for) are refused.
    #[derive(Clone, Default)]
    pub struct MockCredentialProvisioner {
        failing: Arc<Mutex<HashSet<String>>>,
        pub issued: Arc<Mutex<Vec<String>>>,
    }

    impl MockCredentialProvisioner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_for(&self, username: &str) {
            if let Ok(mut failing) = self.failing.lock() {
                failing.insert(username.to_owned());
            }
        }
    }

    #[async_trait]
    impl CredentialProvisioner for MockCredentialProvisioner {
        async fn issue(&self, cluster: &Cluster, username: &str) -> Result<Credential, AccessError> {
            let failing = self
                .failing
                .lock()
                .map_err(|_| AccessError::Internal("lock poisoned".into()))?;
            if failing.contains(username) {
                return Err(AccessError::CredentialIssuance(format!(
                    "certificate signing request for {username} was denied"
                )));
            }
            drop(failing);

            self.issued
                .lock()
                .map_err(|_| AccessError::Internal("lock poisoned".into()))?
                .push(username.to_owned());

            Ok(Credential::new(format!(
                "-----BEGIN CERTIFICATE-----\n{}:{}\n-----END CERTIFICATE-----\n",
                cluster.uuid, username
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> Cluster {
        Cluster::new("prod", "8f14e45f-ceea-4e67-a9a6-0c1b2f3e4d5a", "admin")
    }

    #[test]
    fn test_credential_debug_redacted() {
        let credential = Credential::new(b"secret-cert".to_vec());
        assert_eq!(format!("{credential:?}"), "Credential([REDACTED; 11 bytes])");
        assert_eq!(credential.as_bytes(), b"secret-cert");
    }

    #[tokio::test]
    async fn test_mock_provisioner_issues() {
        let provisioner = MockCredentialProvisioner::new();
        let credential = provisioner.issue(&cluster(), "alice").await.unwrap();

        assert!(!credential.is_empty());
        assert_eq!(provisioner.issued.lock().unwrap().as_slice(), ["alice"]);
    }

    #[tokio::test]
    async fn test_mock_provisioner_fails_for_user() {
        let provisioner = MockCredentialProvisioner::new();
        provisioner.fail_for("mallory");

        let result = provisioner.issue(&cluster(), "mallory").await;
        assert!(matches!(result, Err(AccessError::CredentialIssuance(_))));
        assert!(provisioner.issued.lock().unwrap().is_empty());
    }
}
