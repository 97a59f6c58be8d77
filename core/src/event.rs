//! Typed events decoded from the push stream.
//!
//! Every record received on the server-push stream is decoded into exactly one
//! [`StreamEvent`]. The enum is closed on purpose: matching is exhaustive, so a
//! new event kind is a compile error at every consumer instead of a silently
//! dropped message.

use serde_json::Value;

/// One raw record as received from the push stream, before decoding.
///
/// `event` is the record's type tag (the SSE `event:` field, empty when the
/// server sent none) and `data` is the payload body (JSON text, or the literal
/// `pong` for heartbeats).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// Record type tag; empty if the server did not set one
    pub event: String,
    /// Raw payload body
    pub data: String,
}

/// Domain entity kinds carried by `Data` events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Data source entities
    DataSources,
    /// Calculation entities
    Calculations,
    /// Collection entities
    Collections,
}

impl EntityKind {
    /// Wire tag for this kind, as it appears in the stream record type field.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::DataSources => "datasources",
            Self::Calculations => "calculations",
            Self::Collections => "collections",
        }
    }

    /// Parse a wire tag into a kind.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "datasources" => Some(Self::DataSources),
            "calculations" => Some(Self::Calculations),
            "collections" => Some(Self::Collections),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One server-reported error inside an `Errors` event.
///
/// The wire format is `{status, error: string | {message: string}}`; the two
/// message shapes are flattened here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorEntry {
    /// HTTP-style status code reported by the server
    pub status: u16,
    /// Human-readable error message
    pub message: String,
}

/// Payload of a `Data` event.
///
/// Item and type objects are kept dynamic (`serde_json::Value`) with keys
/// already normalized to `snake_case`; typed deserialization is the caller's
/// concern.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataPayload {
    /// Correlation id echoed from the HTTP command that caused this event
    pub request_id: String,
    /// Domain items carried by the event
    pub items: Vec<Value>,
    /// Total number of items on the server (may exceed `items.len()`)
    pub total: u64,
    /// Auxiliary type records, if any
    pub types: Vec<Value>,
}

/// A decoded push-stream event.
///
/// Immutable once constructed; produced by [`crate::codec::decode`], consumed
/// by [`crate::Hub::publish`] and by correlation matching.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Domain data delivered for a previously submitted command
    Data {
        /// Which entity kind the items belong to
        kind: EntityKind,
        /// Correlation id, items, and counters
        payload: DataPayload,
    },
    /// Server-reported errors for a previously submitted command
    Errors {
        /// Correlation id; empty for synthetic decode-failure events
        request_id: String,
        /// One entry per reported error, oldest first
        errors: Vec<ErrorEntry>,
    },
    /// Keep-alive heartbeat; confirms stream liveness, never correlated
    Pong,
    /// Record with an unrecognized type tag, preserved verbatim.
    ///
    /// Still published so raw-stream observers see everything, but the
    /// correlation protocol never matches on it.
    Unknown {
        /// Raw record type tag
        event: String,
        /// Raw payload body
        data: String,
    },
}

impl StreamEvent {
    /// Correlation id carried by this event, if it can carry one.
    ///
    /// Returns `None` for `Pong` and `Unknown`. An empty id is returned as-is;
    /// the correlation protocol treats empty ids as unmatchable.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Data { payload, .. } => Some(&payload.request_id),
            Self::Errors { request_id, .. } => Some(request_id),
            Self::Pong | Self::Unknown { .. } => None,
        }
    }

    /// Whether this is an `Errors` event with at least one entry.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Errors { errors, .. } if !errors.is_empty())
    }
}
