//! Real-time fanout for release changes.
//!
//! Delivery is fire-and-forget over two named event channels: no
//! acknowledgments, no retries, no retained events for disconnected clients.
//! A client that reconnects must reconcile by pulling the full release list
//! from the REST surface.

mod events;
mod hub;
mod ws;

pub use events::{ReleaseEvent, RELEASES_UPDATED, RELEASE_NEW};
pub use hub::{EventHub, NoopNotifier, Notifier};
pub use ws::router;
