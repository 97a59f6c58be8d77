//! Connection manager for the server-push event stream.
//!
//! Maintains the invariant "the physical stream is open if and only if at
//! least one subscription exists". A consumer task sleeps until the hub
//! reports a subscriber, then spawns the stream task and pings the backend
//! until the hub reports connected. The stream task reads, decodes, and
//! publishes records, reconnecting with exponential backoff on transient
//! failures; after each record it checks for remaining subscribers and shuts
//! itself down when there are none, returning the manager to idle. A later
//! subscription starts the cycle again.

use crate::sse::record_stream;
use crate::transport::Transport;
use catalyst_core::hub::Predicate;
use catalyst_core::{Error, Hub, Subscription, decode};
use futures::StreamExt;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, warn};

/// First reconnect delay; doubles (or grows 1.5x for timeouts) per
/// consecutive transient failure, resets after any received record.
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Upper bound for the reconnect delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Poll interval for the keep-alive ping while waiting for the first record.
const PING_INTERVAL: Duration = Duration::from_millis(100);

/// Consecutive failed connection attempts before the stream task gives up.
const MAX_CONSECUTIVE_REFUSALS: u32 = 5;

/// Reconnect delay tracker.
///
/// Disarmed until the first failure, so a healthy connect happens
/// immediately; armed growth is monotonic up to [`MAX_BACKOFF`].
#[derive(Debug)]
pub(crate) struct Backoff {
    current: Duration,
    armed: bool,
}

impl Backoff {
    pub(crate) const fn new() -> Self {
        Self {
            current: INITIAL_BACKOFF,
            armed: false,
        }
    }

    /// Forget all failures; the next attempt is immediate.
    pub(crate) fn reset(&mut self) {
        self.current = INITIAL_BACKOFF;
        self.armed = false;
    }

    /// Record a failure; returns the delay the next wait will apply.
    pub(crate) fn grow(&mut self, factor: f64) -> Duration {
        self.current = if self.armed {
            self.current.mul_f64(factor).min(MAX_BACKOFF)
        } else {
            INITIAL_BACKOFF
        };
        self.armed = true;
        self.current
    }

    /// Sleep for the current delay, if any failure has been recorded.
    pub(crate) async fn wait(&self) {
        if self.armed {
            tokio::time::sleep(self.current).await;
        }
    }
}

/// Owner of the consumer and stream tasks; one per client session.
pub(crate) struct StreamManager {
    hub: Hub,
    consumer: Mutex<Option<JoinHandle<()>>>,
    stream_task: Arc<Mutex<Option<AbortHandle>>>,
}

impl StreamManager {
    /// Create the manager and start its background consumer task.
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        let hub = Hub::new();
        let stream_task = Arc::new(Mutex::new(None));
        let consumer = tokio::spawn(consume(transport, hub.clone(), Arc::clone(&stream_task)));
        Self {
            hub,
            consumer: Mutex::new(Some(consumer)),
            stream_task,
        }
    }

    /// Open a subscription; lazily wakes the connection manager.
    pub(crate) fn subscribe(&self, predicate: Option<Predicate>) -> Subscription {
        self.hub.subscribe(predicate)
    }

    pub(crate) const fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Stop both background tasks and force-close every subscription.
    ///
    /// Idempotent. In-flight correlation calls observe the closed hub as
    /// "no match found" instead of hanging.
    pub(crate) fn close(&self) {
        if let Ok(mut slot) = self.consumer.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
        if let Ok(mut slot) = self.stream_task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
        self.hub.close();
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// Background consumer: wake on subscribers, run the stream task for as long
/// as they stay, and ping until the stream produces its first record.
///
/// The consumer awaits the stream task's handle, so however the task ends
/// (idle shutdown, terminal failure, a subscriber racing the shutdown check)
/// the subscriber count is re-examined and the stream restarted immediately
/// when someone is still listening.
async fn consume(
    transport: Arc<Transport>,
    hub: Hub,
    stream_task: Arc<Mutex<Option<AbortHandle>>>,
) {
    loop {
        if hub.subscriber_count() == 0 {
            hub.subscriber_added().await;
            // The stored permit can predate an unsubscribe; recheck.
            if hub.subscriber_count() == 0 {
                continue;
            }
        }

        debug!("subscriber present, opening event stream");
        let mut task = tokio::spawn(run_stream(Arc::clone(&transport), hub.clone()));
        if let Ok(mut slot) = stream_task.lock() {
            *slot = Some(task.abort_handle());
        }

        tokio::select! {
            _ = &mut task => {}
            () = async {
                // Provoke the server into confirming the stream; success or
                // failure of the ping itself only matters for logging.
                while !hub.is_connected() {
                    tokio::time::sleep(PING_INTERVAL).await;
                    if let Err(err) = transport.ping().await {
                        debug!(error = %err, "keep-alive ping failed");
                    }
                }
                std::future::pending().await
            } => {}
        }
    }
}

/// The stream task: connect, read, decode, publish, classify failures.
async fn run_stream(transport: Arc<Transport>, hub: Hub) {
    let mut backoff = Backoff::new();
    let mut refusals: u32 = 0;

    loop {
        backoff.wait().await;

        if let Err(err) = transport.ensure_auth(false).await {
            warn!(error = %err, "authentication before stream open failed");
            backoff.grow(2.0);
            continue;
        }

        let response = match transport.open_stream().await {
            Ok(response) => response,
            Err(Error::Timeout(reason)) => {
                warn!(%reason, "stream connect timed out, reconnecting");
                backoff.grow(1.5);
                continue;
            }
            Err(err) => {
                refusals += 1;
                if refusals >= MAX_CONSECUTIVE_REFUSALS {
                    error!(error = %err, attempts = refusals, "stream connection refused repeatedly, giving up");
                    // Terminal: end the waiters instead of stranding them.
                    hub.abort();
                    return;
                }
                let delay = backoff.grow(2.0);
                warn!(error = %err, "stream connection failed, reconnecting in {delay:?}");
                continue;
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // Auth expiry: force a fresh cycle, retry without counting this
            // as a backoff step.
            debug!("stream rejected with 401, forcing re-authentication");
            if let Err(err) = transport.ensure_auth(true).await {
                warn!(error = %err, "forced re-authentication failed");
            }
            continue;
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let delay = backoff.grow(2.0);
            warn!(%status, "stream unavailable, reconnecting in {delay:?}");
            continue;
        }
        if !status.is_success() {
            error!(%status, "stream request rejected, giving up");
            hub.abort();
            return;
        }
        refusals = 0;

        let records = record_stream(response);
        tokio::pin!(records);
        let mut errored = false;
        while let Some(item) = records.next().await {
            match item {
                Ok(record) => {
                    backoff.reset();
                    hub.set_connected();
                    hub.publish(&decode(&record));
                    if hub.subscriber_count() == 0 {
                        debug!("last subscriber gone, closing stream");
                        hub.set_disconnected();
                        return;
                    }
                }
                Err(Error::Timeout(reason)) => {
                    warn!(%reason, "stream read timed out, reconnecting");
                    backoff.grow(1.5);
                    errored = true;
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "stream failed, reconnecting");
                    backoff.grow(2.0);
                    errored = true;
                    break;
                }
            }
        }
        hub.set_disconnected();
        if !errored {
            // Server closed an intact stream; reconnect, but never hot-loop.
            debug!("stream ended, reconnecting");
            backoff.grow(1.5);
        }
    }
}
