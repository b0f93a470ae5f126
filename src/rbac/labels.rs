//! Ownership labels.
//!
//! Every binding object this crate creates carries three labels: a constant
//! "managed by" marker, the owning cluster's unique identifier and the bound
//! username. [`OwnershipLabels`] is the only way to name a set of remote
//! objects: the remote API trait takes it as a required argument on every
//! list and delete, so an unscoped query cannot be expressed.

use std::collections::BTreeMap;

use crate::config::LabelConfig;

/// The (marker, cluster id, username) label triple for one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipLabels {
    manage: (String, String),
    cluster_id: (String, String),
    username: (String, String),
}

impl OwnershipLabels {
    pub fn new(config: &LabelConfig, cluster_id: &str, username: &str) -> Self {
        Self {
            manage: (config.manage_key.clone(), config.manage_value.clone()),
            cluster_id: (config.cluster_id_key.clone(), cluster_id.to_owned()),
            username: (config.username_key.clone(), username.to_owned()),
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id.1
    }

    pub fn username(&self) -> &str {
        &self.username.1
    }

    pub fn pairs(&self) -> [(&str, &str); 3] {
        [
            (self.manage.0.as_str(), self.manage.1.as_str()),
            (self.cluster_id.0.as_str(), self.cluster_id.1.as_str()),
            (self.username.0.as_str(), self.username.1.as_str()),
        ]
    }

    /// Label selector string with all three pairs ANDed, e.g.
    /// `manage=clusteraccess,cluster-id=1234,username=alice`.
    pub fn selector(&self) -> String {
        self.pairs()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Labels to write on a newly created binding object.
    pub fn to_labels(&self) -> BTreeMap<String, String> {
        self.pairs()
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    /// True only when all three labels are present with matching values.
    pub fn is_owned(&self, labels: &BTreeMap<String, String>) -> bool {
        self.pairs()
            .iter()
            .all(|(key, value)| labels.get(*key).is_some_and(|v| v == value))
    }
}
