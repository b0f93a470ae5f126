use async_trait::async_trait;

use super::AccessEvent;

/// Handles membership events asynchronously.
///
/// # Example
///
/// ```rust,ignore
/// use clusteraccess::events::{AccessEvent, Listener};
/// use async_trait::async_trait;
///
/// struct AuditTrail;
///
/// #[async_trait]
/// impl Listener for AuditTrail {
///     async fn handle(&self, event: &AccessEvent) {
///         if let AccessEvent::RemoteCleanupFailed { cluster, username, .. } = event {
///             // queue a garbage collection pass for this user
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Called for every dispatched event; match on the variant to filter.
    async fn handle(&self, event: &AccessEvent);
}
