use async_trait::async_trait;

use crate::events::{AccessEvent, Listener};

/// Emits membership events as tracing events.
///
/// Requires the `tracing` feature to be enabled.
///
/// # Example
///
/// ```rust,ignore
/// use clusteraccess::register_event_listeners;
/// use clusteraccess::events::listeners::TracingListener;
///
/// register_event_listeners(|registry| {
///     registry.listen(TracingListener);
/// });
/// ```
pub struct TracingListener;

#[async_trait]
impl Listener for TracingListener {
    async fn handle(&self, event: &AccessEvent) {
        tracing::info!(
            target: "clusteraccess::events",
            event_name = event.name(),
            cluster = event.cluster(),
            username = event.username(),
            ?event,
            "membership event"
        );
    }
}
