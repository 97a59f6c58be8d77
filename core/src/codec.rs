//! Decoding of raw push-stream records into [`StreamEvent`]s.
//!
//! Decoding is total: malformed input never panics and never produces an
//! error value. An undecodable payload for a known record type becomes a
//! synthetic `Errors` event (status 400, empty correlation id) so that a
//! correlation waiter tied to the broken record still receives a terminating
//! answer instead of hanging; a record with an unrecognized type tag is
//! preserved as `Unknown` for raw-stream observers.

use crate::convert::keys_to_snake;
use crate::event::{DataPayload, EntityKind, ErrorEntry, RawRecord, StreamEvent};
use serde_json::Value;

/// Heartbeat payload sent by the server on an otherwise empty record.
const PONG_BODY: &str = "pong";

/// Wire tag of error events.
const ERRORS_TAG: &str = "errors";

/// Decode one raw stream record into a typed event.
#[must_use]
pub fn decode(record: &RawRecord) -> StreamEvent {
    if record.event.is_empty() && record.data == PONG_BODY {
        return StreamEvent::Pong;
    }
    if record.event == ERRORS_TAG {
        return decode_errors(&record.data);
    }
    if let Some(kind) = EntityKind::from_tag(&record.event) {
        return decode_data(kind, &record.data);
    }
    StreamEvent::Unknown {
        event: record.event.clone(),
        data: record.data.clone(),
    }
}

/// Synthetic `Errors` event for payloads that failed to decode.
///
/// Carries an empty correlation id, which is unmatchable by convention, and
/// status 400 with the decode failure message.
fn decode_failure(message: String) -> StreamEvent {
    StreamEvent::Errors {
        request_id: String::new(),
        errors: vec![ErrorEntry {
            status: 400,
            message,
        }],
    }
}

fn decode_data(kind: EntityKind, data: &str) -> StreamEvent {
    let value: Value = match serde_json::from_str(data) {
        Ok(value) => keys_to_snake(value),
        Err(err) => return decode_failure(err.to_string()),
    };

    let request_id = value
        .get("req_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let items = value
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let total = value.get("total").and_then(Value::as_u64).unwrap_or(0);
    let types = value
        .get("types")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    StreamEvent::Data {
        kind,
        payload: DataPayload {
            request_id,
            items,
            total,
            types,
        },
    }
}

fn decode_errors(data: &str) -> StreamEvent {
    let value: Value = match serde_json::from_str(data) {
        Ok(value) => keys_to_snake(value),
        Err(err) => return decode_failure(err.to_string()),
    };

    let request_id = value
        .get("req_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let errors = value
        .get("data")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(decode_error_entry).collect())
        .unwrap_or_default();

    StreamEvent::Errors { request_id, errors }
}

/// Flatten one wire error, `{status, error: string | {message}}`, into an
/// [`ErrorEntry`].
fn decode_error_entry(value: &Value) -> ErrorEntry {
    let status = value
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
        .unwrap_or(500);
    let message = match value.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };
    ErrorEntry { status, message }
}
