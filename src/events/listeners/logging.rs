use async_trait::async_trait;

use crate::events::{AccessEvent, Listener};

/// Writes membership events to the `clusteraccess::events` log target.
///
/// Adds, updates and removals are logged at the configured level. A failed
/// remote cleanup leaves bindings behind that need attention, so it is always
/// logged at `Warn` or louder.
///
/// ```rust,ignore
/// register_event_listeners(|registry| {
///     registry.listen(LoggingListener::with_level(log::Level::Debug));
/// });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LoggingListener {
    level: log::Level,
}

impl LoggingListener {
    pub fn new() -> Self {
        Self::with_level(log::Level::Info)
    }

    pub fn with_level(level: log::Level) -> Self {
        Self { level }
    }

    fn level_for(&self, event: &AccessEvent) -> log::Level {
        match event {
            AccessEvent::RemoteCleanupFailed { .. } => self.level.min(log::Level::Warn),
            _ => self.level,
        }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

/// Logfmt line for an event: common fields first, then per-kind fields.
fn format_event(event: &AccessEvent) -> String {
    let mut line = format!(
        "msg=\"{}\", cluster=\"{}\", username=\"{}\"",
        event.name(),
        event.cluster(),
        event.username()
    );

    match event {
        AccessEvent::MemberAdded {
            operator,
            cluster_roles,
            namespace_roles,
            ..
        } => line.push_str(&format!(
            ", operator=\"{operator}\", cluster_roles={cluster_roles}, namespace_roles={namespace_roles}"
        )),
        AccessEvent::MemberUpdated {
            operator,
            granted,
            revoked,
            ..
        } => line.push_str(&format!(
            ", operator=\"{operator}\", granted={granted}, revoked={revoked}"
        )),
        AccessEvent::MemberRemoved { operator, .. } => {
            line.push_str(&format!(", operator=\"{operator}\""));
        }
        AccessEvent::RemoteCleanupFailed { reason, .. } => {
            line.push_str(&format!(", reason=\"{}\"", reason.replace('"', "'")));
        }
    }

    line.push_str(&format!(", at=\"{}\"", event.timestamp().to_rfc3339()));
    line
}

#[async_trait]
impl Listener for LoggingListener {
    async fn handle(&self, event: &AccessEvent) {
        log::log!(target: "clusteraccess::events", self.level_for(event), "{}", format_event(event));
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn cleanup_failed() -> AccessEvent {
        AccessEvent::RemoteCleanupFailed {
            cluster: "edge-eu".to_owned(),
            username: "alice".to_owned(),
            reason: "remote api error: \"connection reset\"".to_owned(),
            at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_cleanup_failure_is_a_warning() {
        let event = cleanup_failed();

        assert_eq!(LoggingListener::new().level_for(&event), log::Level::Warn);
        assert_eq!(
            LoggingListener::with_level(log::Level::Debug).level_for(&event),
            log::Level::Warn
        );
        assert_eq!(
            LoggingListener::with_level(log::Level::Error).level_for(&event),
            log::Level::Error
        );
    }

    #[test]
    fn test_membership_changes_use_configured_level() {
        let listener = LoggingListener::with_level(log::Level::Debug);
        let removed = AccessEvent::MemberRemoved {
            cluster: "edge-eu".to_owned(),
            username: "alice".to_owned(),
            operator: "importer".to_owned(),
            at: Utc::now(),
        };

        assert_eq!(listener.level_for(&removed), log::Level::Debug);
    }

    #[test]
    fn test_update_line_carries_grant_counts() {
        let event = AccessEvent::MemberUpdated {
            cluster: "edge-eu".to_owned(),
            username: "alice".to_owned(),
            operator: "importer".to_owned(),
            granted: 2,
            revoked: 1,
            at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        };

        assert_eq!(
            format_event(&event),
            "msg=\"member.updated\", cluster=\"edge-eu\", username=\"alice\", operator=\"importer\", granted=2, revoked=1, at=\"2025-03-01T12:00:00+00:00\""
        );
    }

    #[test]
    fn test_cleanup_reason_stays_one_field() {
        let line = format_event(&cleanup_failed());

        assert!(line.starts_with("msg=\"member.remote_cleanup_failed\", cluster=\"edge-eu\", username=\"alice\""));
        assert!(line.contains("reason=\"remote api error: 'connection reset'\""));
        assert!(!line.contains("operator="));
    }

    #[tokio::test]
    async fn test_handle_added() {
        let event = AccessEvent::MemberAdded {
            cluster: "edge-eu".to_owned(),
            username: "alice".to_owned(),
            operator: "importer".to_owned(),
            cluster_roles: 1,
            namespace_roles: 2,
            at: Utc::now(),
        };

        assert!(format_event(&event).contains("cluster_roles=1, namespace_roles=2"));
        LoggingListener::default().handle(&event).await;
    }
}
