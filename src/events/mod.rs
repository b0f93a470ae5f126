//! Membership events.
//!
//! The synchronizer dispatches an [`AccessEvent`] after every add, update and
//! delete, and when remote cleanup after a delete does not complete. Without
//! registered listeners dispatching does nothing.
//!
//! ```rust,ignore
//! use clusteraccess::register_event_listeners;
//! use clusteraccess::events::listeners::LoggingListener;
//!
//! register_event_listeners(|registry| {
//!     registry.listen(LoggingListener::new());
//! });
//! ```

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::AccessEvent;
pub use listener::Listener;
pub use registry::{EventRegistry, dispatch, register_event_listeners};
