use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repository::ClusterBinding;

/// Handle of a registered remote cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Unique cluster name, used as the local record key.
    pub name: String,
    /// Stable identifier written into ownership labels.
    pub uuid: String,
    /// User who registered the cluster. Never a member target.
    pub created_by: String,
}

impl Cluster {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
            created_by: created_by.into(),
        }
    }

    pub fn is_creator(&self, username: &str) -> bool {
        self.created_by == username
    }
}

/// Desired (or observed) permissions of one member.
///
/// Sets collapse duplicate role names. A namespace mapped to an empty set
/// grants nothing; [`normalized`](Self::normalized) drops such entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessAssignment {
    #[serde(default)]
    pub cluster_roles: BTreeSet<String>,
    #[serde(default)]
    pub namespace_roles: BTreeMap<String, BTreeSet<String>>,
}

impl AccessAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cluster_role(mut self, role: impl Into<String>) -> Self {
        self.cluster_roles.insert(role.into());
        self
    }

    #[must_use]
    pub fn with_namespace_role(mut self, namespace: impl Into<String>, role: impl Into<String>) -> Self {
        self.namespace_roles
            .entry(namespace.into())
            .or_default()
            .insert(role.into());
        self
    }

    /// True when the assignment grants nothing at all.
    pub fn is_empty(&self) -> bool {
        self.cluster_roles.is_empty() && self.namespace_roles.values().all(BTreeSet::is_empty)
    }

    /// Number of individual grants.
    pub fn len(&self) -> usize {
        self.cluster_roles.len() + self.namespace_roles.values().map(BTreeSet::len).sum::<usize>()
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.namespace_roles.retain(|_, roles| !roles.is_empty());
        self
    }

    /// Every grant as `(namespace, role)`, cluster-wide roles first.
    pub fn grants(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        let cluster = self.cluster_roles.iter().map(|role| (None, role.as_str()));
        let namespaced = self.namespace_roles.iter().flat_map(|(namespace, roles)| {
            roles
                .iter()
                .map(move |role| (Some(namespace.as_str()), role.as_str()))
        });
        cluster.chain(namespaced)
    }

    /// Grants present in `self` but not in `other`.
    #[must_use]
    pub fn difference(&self, other: &AccessAssignment) -> AccessAssignment {
        let cluster_roles = self
            .cluster_roles
            .difference(&other.cluster_roles)
            .cloned()
            .collect();

        let namespace_roles = self
            .namespace_roles
            .iter()
            .filter_map(|(namespace, roles)| {
                let missing: BTreeSet<String> = match other.namespace_roles.get(namespace) {
                    Some(existing) => roles.difference(existing).cloned().collect(),
                    None => roles.clone(),
                };
                (!missing.is_empty()).then(|| (namespace.clone(), missing))
            })
            .collect();

        AccessAssignment {
            cluster_roles,
            namespace_roles,
        }
    }
}

/// Roles granted inside one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRoles {
    pub namespace: String,
    pub roles: BTreeSet<String>,
}

/// Live access of a member, as read back from the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub username: String,
    pub cluster_roles: BTreeSet<String>,
    /// One entry per namespace, ordered by namespace name.
    pub namespace_roles: Vec<NamespaceRoles>,
}

impl MemberView {
    pub fn from_assignment(username: impl Into<String>, assignment: AccessAssignment) -> Self {
        let assignment = assignment.normalized();
        Self {
            username: username.into(),
            cluster_roles: assignment.cluster_roles,
            namespace_roles: assignment
                .namespace_roles
                .into_iter()
                .map(|(namespace, roles)| NamespaceRoles { namespace, roles })
                .collect(),
        }
    }

    pub fn to_assignment(&self) -> AccessAssignment {
        AccessAssignment {
            cluster_roles: self.cluster_roles.clone(),
            namespace_roles: self
                .namespace_roles
                .iter()
                .map(|entry| (entry.namespace.clone(), entry.roles.clone()))
                .collect(),
        }
    }
}

/// Entry of a cluster's member list. Built from local records only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    /// Member username.
    pub name: String,
    pub binding_name: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<ClusterBinding> for MemberSummary {
    fn from(binding: ClusterBinding) -> Self {
        Self {
            name: binding.user_ref,
            binding_name: binding.name,
            created_by: binding.created_by,
            created_at: binding.created_at,
        }
    }
}
