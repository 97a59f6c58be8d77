//! # Catalyst Core
//!
//! Stream correlation engine for the Catalyst platform API.
//!
//! The Catalyst backend answers asynchronous commands out-of-band: the HTTP
//! response carries only a correlation id, and the actual result arrives later
//! on a shared server-push event stream. This crate bridges those two channels
//! into a request/response abstraction usable by arbitrary concurrent callers:
//!
//! - [`codec`] parses one raw stream record into a typed [`StreamEvent`]
//! - [`Hub`] fans each decoded event out to every live [`Subscription`]
//! - [`Subscription`] is one consumer's bounded, filtered view of the stream
//! - [`correlate`] pairs a submitted command with its eventual matching event
//!
//! The physical connection (HTTP transport, SSE framing, reconnect/backoff,
//! authentication) lives in the `catalyst-client` crate; this crate is
//! transport-free and fully testable in-process.
//!
//! ## Example
//!
//! ```
//! use catalyst_core::{Hub, StreamEvent, act_and_correlate};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), catalyst_core::Error> {
//! let hub = Hub::new();
//! hub.set_connected();
//!
//! let publisher = hub.clone();
//! tokio::spawn(async move {
//!     let record = catalyst_core::RawRecord {
//!         event: "datasources".into(),
//!         data: r#"{"reqId":"r-1","data":[],"total":0,"types":[]}"#.into(),
//!     };
//!     publisher.publish(&catalyst_core::decode(&record));
//! });
//!
//! let event = act_and_correlate(
//!     || hub.subscribe(None),
//!     || async { Ok("r-1".to_string()) },
//! )
//! .await?;
//! assert!(matches!(event, StreamEvent::Data { .. }));
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod convert;
pub mod correlate;
pub mod error;
pub mod event;
pub mod hub;
pub mod subscription;

pub use codec::decode;
pub use correlate::act_and_correlate;
pub use error::Error;
pub use event::{DataPayload, EntityKind, ErrorEntry, RawRecord, StreamEvent};
pub use hub::Hub;
pub use subscription::Subscription;
