use std::collections::BTreeMap;

/// Where a binding applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingScope {
    /// Cluster-wide binding (`ClusterRoleBinding`).
    Cluster,
    /// Binding limited to one namespace (`RoleBinding`).
    Namespace(String),
}

impl BindingScope {
    pub fn from_namespace(namespace: Option<&str>) -> Self {
        match namespace {
            Some(ns) => BindingScope::Namespace(ns.to_owned()),
            None => BindingScope::Cluster,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            BindingScope::Cluster => None,
            BindingScope::Namespace(ns) => Some(ns.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub kind: String,
    pub name: String,
}

/// A permission binding object as stored in the remote cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBindingObject {
    pub name: String,
    pub scope: BindingScope,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub role_ref: RoleRef,
    pub subjects: Vec<Subject>,
}

impl RoleBindingObject {
    /// Binds `role` (a `ClusterRole`) to the user `username`.
    pub fn for_user(name: String, scope: BindingScope, role: &str, username: &str) -> Self {
        Self {
            name,
            scope,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            role_ref: RoleRef {
                kind: "ClusterRole".to_owned(),
                name: role.to_owned(),
            },
            subjects: vec![Subject {
                kind: "User".to_owned(),
                name: username.to_owned(),
            }],
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.scope.namespace()
    }
}
