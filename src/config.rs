//! Configuration types for member access synchronization.
//!
//! # Example
//!
//! ```rust
//! use clusteraccess::config::{AccessConfig, LabelConfig, UpdateStrategy};
//!
//! // Use defaults
//! let config = AccessConfig::default();
//!
//! // Or customize
//! let config = AccessConfig {
//!     labels: LabelConfig {
//!         manage_value: "ops-portal".to_owned(),
//!         ..Default::default()
//!     },
//!     update_strategy: UpdateStrategy::Patch,
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

/// Main configuration for the member synchronizer.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Ownership label keys and the marker value written to remote bindings.
    pub labels: LabelConfig,

    /// Prefix of remote binding object names (`{prefix}:{username}:{role}:{digest}`).
    ///
    /// Default: `clusteraccess`
    pub binding_name_prefix: String,

    /// How `update_member` converges the remote binding set.
    pub update_strategy: UpdateStrategy,

    /// Remote API client settings.
    pub remote: RemoteConfig,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            labels: LabelConfig::default(),
            binding_name_prefix: "clusteraccess".to_owned(),
            update_strategy: UpdateStrategy::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl AccessConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Label keys identifying remote bindings owned by this system.
///
/// All three labels are written on every binding the synchronizer creates,
/// and all three are required on every list and delete it performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelConfig {
    /// Key of the "managed by" marker label.
    ///
    /// Default: `clusteraccess-manage`
    pub manage_key: String,

    /// Value of the "managed by" marker label.
    ///
    /// Default: `clusteraccess`
    pub manage_value: String,

    /// Key of the label carrying the owning cluster's unique identifier.
    ///
    /// Default: `clusteraccess-cluster-id`
    pub cluster_id_key: String,

    /// Key of the label carrying the bound username.
    ///
    /// Default: `clusteraccess-username`
    pub username_key: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            manage_key: "clusteraccess-manage".to_owned(),
            manage_value: "clusteraccess".to_owned(),
            cluster_id_key: "clusteraccess-cluster-id".to_owned(),
            username_key: "clusteraccess-username".to_owned(),
        }
    }
}

/// Strategy used by `update_member` to move from the current to the desired
/// binding set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateStrategy {
    /// Revoke every owned binding, then grant the desired set.
    ///
    /// The member briefly holds no grants while the update runs.
    #[default]
    Recreate,
    /// Grant only missing bindings and revoke only extraneous ones.
    Patch,
}

/// Settings for clients talking to remote cluster APIs.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Per-request timeout. Expiry is reported as `RemoteError::Timeout`.
    ///
    /// Default: 30 seconds
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AccessConfig::default();
        assert_eq!(config.binding_name_prefix, "clusteraccess");
        assert_eq!(config.update_strategy, UpdateStrategy::Recreate);
        assert_eq!(config.remote.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_default_labels_are_distinct() {
        let labels = LabelConfig::default();
        assert_ne!(labels.manage_key, labels.cluster_id_key);
        assert_ne!(labels.manage_key, labels.username_key);
        assert_ne!(labels.cluster_id_key, labels.username_key);
    }

    #[test]
    fn test_custom_config() {
        let config = AccessConfig {
            update_strategy: UpdateStrategy::Patch,
            remote: RemoteConfig {
                timeout: Duration::from_secs(5),
            },
            ..Default::default()
        };

        assert_eq!(config.update_strategy, UpdateStrategy::Patch);
        assert_eq!(config.remote.timeout, Duration::from_secs(5));
        assert_eq!(config.labels, LabelConfig::default());
    }
}
