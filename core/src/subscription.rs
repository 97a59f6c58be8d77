//! One consumer's bounded, filtered view onto the hub's event flow.

use crate::event::StreamEvent;
use crate::hub::HubInner;
use std::sync::Weak;
use tokio::sync::mpsc;

/// A live subscription to the event hub.
///
/// Created by [`Hub::subscribe`](crate::Hub::subscribe); owned by exactly one
/// consumer. Events published while the subscription is registered accumulate
/// in a bounded queue and are pulled with [`next`](Self::next).
///
/// A subscription unregisters itself from the hub on every exit path: call
/// [`close`](Self::close) explicitly or just let it drop. After the hub
/// unregisters it (including via [`Hub::close`](crate::Hub::close)), already
/// queued events keep draining and `next` then returns `None`; an in-flight
/// `next` is never left dangling.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<StreamEvent>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub(crate) const fn new(id: u64, rx: mpsc::Receiver<StreamEvent>, hub: Weak<HubInner>) -> Self {
        Self { id, rx, hub }
    }

    /// Pull the next event, suspending until one is available.
    ///
    /// Returns `None` once the subscription is unregistered and its queue is
    /// drained. Cancel-safe: dropping the future loses no event.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Number of events currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Wait until the hub reports the underlying stream connected.
    ///
    /// Returns immediately if the hub is already connected, closed, or gone.
    /// Used before submitting a command whose result will arrive on the
    /// stream, so the result cannot be missed to a still-opening connection.
    pub async fn wait_connected(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.wait_connected().await;
        }
    }

    /// Unregister from the hub and discard anything still queued.
    ///
    /// Equivalent to dropping, spelled out for call sites where the scope end
    /// would be far from the logical end of interest.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("queued", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::event::StreamEvent;
    use crate::hub::Hub;
    use std::time::Duration;

    #[tokio::test]
    async fn drop_unregisters_from_hub() {
        let hub = Hub::new();
        {
            let _sub = hub.subscribe(None);
            assert_eq!(hub.subscriber_count(), 1);
        }
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn close_unregisters_from_hub() {
        let hub = Hub::new();
        let sub = hub.subscribe(None);
        sub.close();
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn queued_events_drain_after_unregister() {
        let hub = Hub::new();
        let mut sub = hub.subscribe(None);
        hub.publish(&StreamEvent::Pong);
        hub.publish(&StreamEvent::Pong);
        hub.close();

        assert_eq!(sub.next().await, Some(StreamEvent::Pong));
        assert_eq!(sub.next().await, Some(StreamEvent::Pong));
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn next_is_cancel_safe() {
        let hub = Hub::new();
        let mut sub = hub.subscribe(None);

        // Cancel an in-flight next() by letting the timeout win.
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), sub.next()).await;
        assert!(timed_out.is_err());

        // The event published afterwards is still delivered in full.
        hub.publish(&StreamEvent::Pong);
        assert_eq!(sub.next().await, Some(StreamEvent::Pong));
    }

    #[tokio::test]
    async fn wait_connected_returns_when_hub_is_gone() {
        let hub = Hub::new();
        let sub = hub.subscribe(None);
        // Subscription holds only a weak reference; dropping the hub must not
        // strand the waiter.
        drop(hub);
        tokio::time::timeout(Duration::from_secs(1), sub.wait_connected())
            .await
            .expect("wait_connected hung with no hub");
    }
}
