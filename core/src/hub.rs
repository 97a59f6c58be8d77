//! In-process pub/sub fanout point for decoded stream events.
//!
//! One [`Hub`] exists per logical API session. The connection manager decodes
//! records off the physical stream and calls [`Hub::publish`]; every live
//! [`Subscription`] receives its own copy through a bounded queue. Delivery is
//! strictly non-blocking: a slow or full subscriber drops its own copy and
//! never stalls the publisher or the other subscribers.
//!
//! The hub also carries a level-triggered "connected" signal. The connection
//! manager raises it once the underlying stream has produced at least one
//! record, so a fresh subscriber can avoid racing a not-yet-established
//! connection before submitting its command.

use crate::event::StreamEvent;
use crate::subscription::Subscription;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc, watch};
use tracing::warn;

/// Per-subscription event filter. Events for which the predicate returns
/// `false` are silently dropped before queueing.
pub type Predicate = Box<dyn Fn(&StreamEvent) -> bool + Send + Sync>;

/// Default per-subscription queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Connection signal states. `Closed` is terminal for the whole session and
/// `Aborted` is terminal for the current subscribers only; both release every
/// `wait_connected` waiter so nobody is stranded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Disconnected,
    Connected,
    Closed,
    Aborted,
}

struct Entry {
    tx: mpsc::Sender<StreamEvent>,
    predicate: Option<Predicate>,
}

pub(crate) struct HubInner {
    entries: Mutex<HashMap<u64, Arc<Entry>>>,
    next_id: AtomicU64,
    status: watch::Sender<Status>,
    subscriber_added: Notify,
}

impl HubInner {
    pub(crate) fn unsubscribe(&self, id: u64) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&id);
        }
    }

    pub(crate) async fn wait_connected(&self) {
        let mut rx = self.status.subscribe();
        // Err means the sender is gone, which only happens at teardown.
        let _ = rx
            .wait_for(|status| {
                matches!(
                    status,
                    Status::Connected | Status::Closed | Status::Aborted
                )
            })
            .await;
    }
}

/// Set of live subscriptions plus the stream "connected" signal.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    /// Create an empty, disconnected hub.
    #[must_use]
    pub fn new() -> Self {
        let (status, _) = watch::channel(Status::Disconnected);
        Self {
            inner: Arc::new(HubInner {
                entries: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                status,
                subscriber_added: Notify::new(),
            }),
        }
    }

    /// Register a new subscription with the default queue capacity.
    ///
    /// The subscription is live immediately: events published after this call
    /// are queued for it. It unregisters itself when dropped.
    #[must_use]
    pub fn subscribe(&self, predicate: Option<Predicate>) -> Subscription {
        self.subscribe_with_capacity(predicate, DEFAULT_QUEUE_CAPACITY)
    }

    /// Register a new subscription with an explicit queue capacity (min 1).
    #[must_use]
    pub fn subscribe_with_capacity(
        &self,
        predicate: Option<Predicate>,
        capacity: usize,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(capacity.max(1));
        // After close() the sender is dropped instead of registered, so the
        // subscription ends immediately. A new subscriber after abort() gets
        // a fresh start: the signal drops back to disconnected so its
        // wait_connected blocks until the stream is actually live again.
        if *self.inner.status.borrow() != Status::Closed {
            self.inner.status.send_if_modified(|status| {
                if *status == Status::Aborted {
                    *status = Status::Disconnected;
                    true
                } else {
                    false
                }
            });
            if let Ok(mut entries) = self.inner.entries.lock() {
                entries.insert(id, Arc::new(Entry { tx, predicate }));
            }
            self.inner.subscriber_added.notify_one();
        }
        Subscription::new(id, rx, Arc::downgrade(&self.inner))
    }

    /// Number of currently registered subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Deliver one event to every currently registered subscription.
    ///
    /// Iterates over a snapshot of the registry, so subscribing or
    /// unsubscribing from inside a predicate cannot deadlock. Each delivery is
    /// an independent non-blocking enqueue: a full queue drops the event for
    /// that subscriber only (with a warning), and a closed one is pruned.
    pub fn publish(&self, event: &StreamEvent) {
        let snapshot: Vec<(u64, Arc<Entry>)> = match self.inner.entries.lock() {
            Ok(entries) => entries.iter().map(|(id, e)| (*id, Arc::clone(e))).collect(),
            Err(_) => return,
        };

        let mut stale = Vec::new();
        for (id, entry) in snapshot {
            if let Some(predicate) = &entry.predicate {
                if !predicate(event) {
                    continue;
                }
            }
            match entry.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscription = id, "subscription queue is full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => stale.push(id),
            }
        }

        if !stale.is_empty() {
            if let Ok(mut entries) = self.inner.entries.lock() {
                for id in stale {
                    entries.remove(&id);
                }
            }
        }
    }

    /// Mark the underlying stream as live.
    pub fn set_connected(&self) {
        self.inner.status.send_if_modified(|status| {
            if matches!(status, Status::Disconnected | Status::Aborted) {
                *status = Status::Connected;
                true
            } else {
                false
            }
        });
    }

    /// Mark the underlying stream as down.
    pub fn set_disconnected(&self) {
        self.inner.status.send_if_modified(|status| {
            if *status == Status::Connected {
                *status = Status::Disconnected;
                true
            } else {
                false
            }
        });
    }

    /// Whether the underlying stream has produced at least one record since
    /// the last disconnect.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.inner.status.borrow() == Status::Connected
    }

    /// Wait until the stream is connected (or the hub is closed).
    pub async fn wait_connected(&self) {
        self.inner.wait_connected().await;
    }

    /// Wait until a subscription is registered.
    ///
    /// Used by the connection manager to open the physical stream lazily. A
    /// registration that happened while nobody was waiting is not lost: the
    /// next call returns immediately.
    pub async fn subscriber_added(&self) {
        self.inner.subscriber_added.notified().await;
    }

    /// End every live subscription and release all connection waiters, while
    /// keeping the hub usable for future subscribers.
    ///
    /// Used when the underlying stream fails unrecoverably: current waiters
    /// observe the end of their subscription (drain, then `None`) instead of
    /// hanging, and the next `subscribe` starts from a clean disconnected
    /// signal. A hub that is already closed stays closed.
    pub fn abort(&self) {
        self.inner.status.send_if_modified(|status| {
            if *status == Status::Closed {
                false
            } else {
                *status = Status::Aborted;
                true
            }
        });
        if let Ok(mut entries) = self.inner.entries.lock() {
            entries.clear();
        }
    }

    /// Force-close every live subscription and release all waiters.
    ///
    /// Pending `next()` calls drain whatever is already queued and then end.
    /// Used at session teardown; the hub accepts no further state changes.
    pub fn close(&self) {
        self.inner.status.send_replace(Status::Closed);
        if let Ok(mut entries) = self.inner.entries.lock() {
            entries.clear();
        }
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("subscribers", &self.subscriber_count())
            .field("connected", &self.is_connected())
            .finish()
    }
}
