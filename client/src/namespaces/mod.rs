//! Endpoint namespaces, grouped the way the backend routes them.
//!
//! Every command endpoint answers with a correlation id only; the `*_event`
//! methods return that acknowledgement as-is, while the plain methods wrap
//! the command in the correlation protocol and hand back the decoded result
//! carried by the shared event stream.

mod auth;
mod calculations;
mod collections;
mod datasources;

pub use auth::Auth;
pub use calculations::Calculations;
pub use collections::Collections;
pub use datasources::DataSources;

use crate::stream::StreamManager;
use crate::transport::Transport;
use crate::types::RequestId;
use catalyst_core::{EntityKind, Error, StreamEvent, act_and_correlate};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Fire one command request and parse the correlation acknowledgement.
async fn command(
    transport: &Transport,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> Result<RequestId, Error> {
    let value = transport.request_json(method, path, body, true).await?;
    serde_json::from_value(value)
        .map_err(|err| Error::Decode(format!("missing correlation id in response: {err}")))
}

/// Run `submit` under a fresh stream subscription and wait for the
/// correlated event.
async fn correlate<F, Fut>(stream: &Arc<StreamManager>, submit: F) -> Result<StreamEvent, Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, Error>>,
{
    act_and_correlate(|| stream.subscribe(None), submit).await
}

/// The items of a data event of the given kind; empty for anything else.
fn items_of(event: &StreamEvent, kind: EntityKind) -> &[Value] {
    match event {
        StreamEvent::Data { kind: k, payload } if *k == kind => &payload.items,
        _ => &[],
    }
}

fn created_at(item: &Value) -> &str {
    item.get("created_at").and_then(Value::as_str).unwrap_or("")
}

/// The most recently created item of a data event.
///
/// A mutating command answers with the full current listing; the entity
/// the command produced is the newest one. RFC 3339 timestamps compare
/// correctly as strings.
fn latest_item(event: &StreamEvent, kind: EntityKind) -> Option<Value> {
    items_of(event, kind)
        .iter()
        .max_by(|a, b| created_at(a).cmp(created_at(b)))
        .cloned()
}

fn decode_item<T: DeserializeOwned>(item: Value) -> Result<T, Error> {
    serde_json::from_value(item).map_err(|err| Error::Decode(err.to_string()))
}

fn decode_items<T: DeserializeOwned>(event: &StreamEvent, kind: EntityKind) -> Result<Vec<T>, Error> {
    items_of(event, kind)
        .iter()
        .cloned()
        .map(decode_item)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use catalyst_core::DataPayload;
    use serde_json::json;

    fn data_event(kind: EntityKind, items: Vec<Value>) -> StreamEvent {
        StreamEvent::Data {
            kind,
            payload: DataPayload {
                request_id: "r-1".into(),
                total: items.len() as u64,
                types: Vec::new(),
                items,
            },
        }
    }

    #[test]
    fn latest_item_picks_newest_timestamp() {
        let event = data_event(
            EntityKind::DataSources,
            vec![
                json!({"id": 1, "created_at": "2024-01-02T00:00:00Z"}),
                json!({"id": 2, "created_at": "2024-03-01T00:00:00Z"}),
                json!({"id": 3, "created_at": "2024-02-01T00:00:00Z"}),
            ],
        );
        let latest = latest_item(&event, EntityKind::DataSources).unwrap();
        assert_eq!(latest["id"], 2);
    }

    #[test]
    fn items_without_timestamps_still_yield_something() {
        let event = data_event(EntityKind::Collections, vec![json!({"id": 9})]);
        assert!(latest_item(&event, EntityKind::Collections).is_some());
    }

    #[test]
    fn kind_mismatch_yields_nothing() {
        let event = data_event(EntityKind::Calculations, vec![json!({"id": 1})]);
        assert!(latest_item(&event, EntityKind::DataSources).is_none());
        assert!(items_of(&StreamEvent::Pong, EntityKind::DataSources).is_empty());
    }
}
