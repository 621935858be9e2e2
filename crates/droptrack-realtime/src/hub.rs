//! The broadcast hub and the `Notifier` seam.

use tokio::sync::broadcast;

use crate::events::ReleaseEvent;

/// Capacity of the broadcast channel. Slow subscribers past this many
/// buffered events start lagging and miss messages, which the delivery
/// contract allows.
const CHANNEL_CAPACITY: usize = 256;

/// Publishing side of the fanout, injected into the cycle orchestrator.
///
/// Implementations must be fire-and-forget: `publish` never blocks on
/// subscribers and never reports delivery failure.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: ReleaseEvent);
}

/// Process-wide broadcast hub.
///
/// Cloning shares the underlying channel; the server wires one instance at
/// startup and hands clones to the WebSocket route and the scheduler.
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<ReleaseEvent>,
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribes a new receiver; used by each WebSocket connection.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReleaseEvent> {
        self.sender.subscribe()
    }

    /// Number of currently attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for EventHub {
    fn publish(&self, event: ReleaseEvent) {
        // send only errors when no receiver is attached; an empty room is a
        // normal state for a best-effort broadcast.
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(receivers, "published release event");
            }
            Err(_) => {
                tracing::debug!("no subscribers attached; event dropped");
            }
        }
    }
}

/// Notifier that drops everything; backs dry runs and the CLI, where no
/// subscriber connections exist.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn publish(&self, _event: ReleaseEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use droptrack_core::{Release, ReleaseStatus};

    fn make_release(id: &str) -> Release {
        Release {
            id: id.to_string(),
            source_key: id.to_string(),
            retailer_id: "feature".to_string(),
            retailer_name: "Feature".to_string(),
            product_name: None,
            release_date: None,
            price: None,
            currency: "USD".to_string(),
            status: ReleaseStatus::Upcoming,
            url: "https://feature.com/products/x".to_string(),
            region: "US".to_string(),
            images: vec![],
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();

        hub.publish(ReleaseEvent::New {
            release: make_release("feature-a"),
        });

        match rx.recv().await.unwrap() {
            ReleaseEvent::New { release } => assert_eq!(release.id, "feature-a"),
            other => panic!("expected New event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let hub = EventHub::new();
        hub.publish(ReleaseEvent::ListUpdated { releases: vec![] });
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();

        hub.publish(ReleaseEvent::New {
            release: make_release("feature-a"),
        });
        hub.publish(ReleaseEvent::New {
            release: make_release("feature-b"),
        });
        hub.publish(ReleaseEvent::ListUpdated { releases: vec![] });

        assert!(matches!(
            rx.recv().await.unwrap(),
            ReleaseEvent::New { release } if release.id == "feature-a"
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            ReleaseEvent::New { release } if release.id == "feature-b"
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            ReleaseEvent::ListUpdated { .. }
        ));
    }
}
