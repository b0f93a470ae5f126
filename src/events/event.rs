use chrono::{DateTime, Utc};

/// Membership events emitted by the synchronizer.
///
/// If no listeners are registered they are dropped. Register listeners via
/// [`register_event_listeners`](crate::register_event_listeners).
#[derive(Debug, Clone)]
pub enum AccessEvent {
    MemberAdded {
        cluster: String,
        username: String,
        operator: String,
        cluster_roles: usize,
        namespace_roles: usize,
        at: DateTime<Utc>,
    },
    MemberUpdated {
        cluster: String,
        username: String,
        operator: String,
        granted: usize,
        revoked: usize,
        at: DateTime<Utc>,
    },
    MemberRemoved {
        cluster: String,
        username: String,
        operator: String,
        at: DateTime<Utc>,
    },
    /// Local removal committed but some remote bindings may remain.
    RemoteCleanupFailed {
        cluster: String,
        username: String,
        reason: String,
        at: DateTime<Utc>,
    },
}

impl AccessEvent {
    /// Returns a dot-separated event name for logging/tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MemberAdded { .. } => "member.added",
            Self::MemberUpdated { .. } => "member.updated",
            Self::MemberRemoved { .. } => "member.removed",
            Self::RemoteCleanupFailed { .. } => "member.remote_cleanup_failed",
        }
    }

    pub fn cluster(&self) -> &str {
        match self {
            Self::MemberAdded { cluster, .. }
            | Self::MemberUpdated { cluster, .. }
            | Self::MemberRemoved { cluster, .. }
            | Self::RemoteCleanupFailed { cluster, .. } => cluster,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Self::MemberAdded { username, .. }
            | Self::MemberUpdated { username, .. }
            | Self::MemberRemoved { username, .. }
            | Self::RemoteCleanupFailed { username, .. } => username,
        }
    }

    /// Returns the timestamp when this event occurred.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::MemberAdded { at, .. }
            | Self::MemberUpdated { at, .. }
            | Self::MemberRemoved { at, .. }
            | Self::RemoteCleanupFailed { at, .. } => *at,
        }
    }
}
