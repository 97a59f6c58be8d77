//! Correlation protocol: pair a submitted command with its eventual event.
//!
//! The backend acknowledges a command with a correlation id in the HTTP
//! response and delivers the actual result later on the shared push stream.
//! [`act_and_correlate`] bridges the two: it opens a subscription *first*,
//! waits for the stream to be live, submits the command, and then drains the
//! subscription until an event carrying the same id arrives.
//!
//! Exactly one subscription is created and destroyed per call, on every exit
//! path. Concurrent calls never interfere: each has its own queue, and the
//! first match wins for its own id only.

use crate::error::Error;
use crate::event::StreamEvent;
use crate::subscription::Subscription;
use std::future::Future;

/// Submit a command and wait for the stream event correlated to it.
///
/// `subscribe` opens a fresh [`Subscription`] (typically a closure over
/// `hub.subscribe(..)`, which also lazily starts the connection manager);
/// `submit` performs the HTTP command and resolves to the server-issued
/// correlation id.
///
/// Events with an empty correlation id never match, by convention: the
/// codec's synthetic decode-failure events carry an empty id, and a waiter
/// must not treat those as wildcard answers.
///
/// # Errors
///
/// - the error of `submit` itself, if the command fails;
/// - a domain error mapped from the **last** entry of a matched `Errors`
///   event (see [`Error::from_status`]);
/// - [`Error::Cancelled`] if the subscription ends (stream closed, session
///   torn down) before a matching event arrives — callers never hang.
pub async fn act_and_correlate<S, F, Fut>(subscribe: S, submit: F) -> Result<StreamEvent, Error>
where
    S: FnOnce() -> Subscription,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, Error>>,
{
    let mut sub = subscribe();
    let result = correlate(&mut sub, submit).await;
    sub.close();
    result
}

async fn correlate<F, Fut>(sub: &mut Subscription, submit: F) -> Result<StreamEvent, Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, Error>>,
{
    sub.wait_connected().await;
    let request_id = submit().await?;

    while let Some(event) = sub.next().await {
        match event.request_id() {
            Some(id) if !id.is_empty() && id == request_id => {
                return raise_on_error_event(event);
            }
            _ => {}
        }
    }
    Err(Error::Cancelled)
}

/// Convert a matched `Errors` event into the typed domain error of its last
/// entry; pass every other event through.
fn raise_on_error_event(event: StreamEvent) -> Result<StreamEvent, Error> {
    if let StreamEvent::Errors { errors, .. } = &event {
        if let Some(last) = errors.last() {
            return Err(Error::from_status(last.status, last.message.clone()));
        }
    }
    Ok(event)
}
