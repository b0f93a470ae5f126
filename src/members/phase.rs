use std::fmt;

/// Steps of a membership change, used for logging.
///
/// Add: `Requested → CredentialIssuing → RecordPersisting → BindingsApplying
/// → Committed | RolledBack`.
/// Update: `Requested → RemoteRevoking → RecordTouching → BindingsReapplying
/// → Committed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Requested,
    CredentialIssuing,
    RecordPersisting,
    BindingsApplying,
    RemoteRevoking,
    RecordTouching,
    BindingsReapplying,
    Committed,
    RolledBack,
    Failed,
}

impl SyncPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::CredentialIssuing => "credential_issuing",
            Self::RecordPersisting => "record_persisting",
            Self::BindingsApplying => "bindings_applying",
            Self::RemoteRevoking => "remote_revoking",
            Self::RecordTouching => "record_touching",
            Self::BindingsReapplying => "bindings_reapplying",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack | Self::Failed)
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks and logs the current phase of one operation.
pub(crate) struct PhaseTracker<'a> {
    operation: &'static str,
    cluster: &'a str,
    username: &'a str,
    current: SyncPhase,
}

impl<'a> PhaseTracker<'a> {
    pub(crate) fn new(operation: &'static str, cluster: &'a str, username: &'a str) -> Self {
        Self {
            operation,
            cluster,
            username,
            current: SyncPhase::Requested,
        }
    }

    pub(crate) fn current(&self) -> SyncPhase {
        self.current
    }

    pub(crate) fn advance(&mut self, next: SyncPhase) {
        log::debug!(
            target: "clusteraccess",
            "msg=\"phase\", operation=\"{}\", cluster=\"{}\", username=\"{}\", from=\"{}\", to=\"{}\"",
            self.operation, self.cluster, self.username, self.current, next
        );
        self.current = next;
    }

    /// Moves to a terminal failure phase, logging where the operation stopped.
    pub(crate) fn fail(&mut self, terminal: SyncPhase, error: &dyn fmt::Display) {
        log::warn!(
            target: "clusteraccess",
            "msg=\"member sync failed\", operation=\"{}\", cluster=\"{}\", username=\"{}\", phase=\"{}\", outcome=\"{}\", error=\"{error}\"",
            self.operation, self.cluster, self.username, self.current, terminal
        );
        self.current = terminal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        assert_eq!(SyncPhase::CredentialIssuing.to_string(), "credential_issuing");
        assert_eq!(SyncPhase::RolledBack.as_str(), "rolled_back");
    }

    #[test]
    fn test_tracker_transitions() {
        let mut tracker = PhaseTracker::new("add_member", "prod", "alice");
        assert_eq!(tracker.current(), SyncPhase::Requested);

        tracker.advance(SyncPhase::CredentialIssuing);
        assert!(!tracker.current().is_terminal());

        tracker.fail(SyncPhase::RolledBack, &"denied");
        assert_eq!(tracker.current(), SyncPhase::RolledBack);
        assert!(tracker.current().is_terminal());
    }
}
