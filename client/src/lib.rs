//! # Catalyst API Client
//!
//! Async client for the Catalyst backend. Commands go out over HTTP and are
//! answered with a correlation id; the actual results arrive on one shared
//! server-push (SSE) stream that the client opens lazily, keeps alive with
//! reconnect backoff, and closes when the last subscriber goes away. The
//! namespace methods hide all of that: each call submits its command, waits
//! for the correlated event, and returns the decoded entity.
//!
//! ## Example
//!
//! ```no_run
//! use catalyst_client::{CatalystClient, LocalUserAuth};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CatalystClient::builder("https://api.example.org")?
//!         .auth(LocalUserAuth::new("user@example.org", "password"))
//!         .build()?;
//!
//!     let source = client
//!         .datasources()
//!         .create("raw content", None, Some("my source"))
//!         .await?;
//!     println!("created: {source:?}");
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - Command/stream correlation with per-call subscriptions
//! - Lazy shared SSE connection with exponential reconnect backoff
//! - Pluggable authentication (token header or session cookie)
//! - Typed endpoint namespaces for data sources, calculations,
//!   collections, and accounts

pub mod auth;
pub mod client;
pub mod namespaces;
mod sse;
mod stream;
mod transport;
pub mod types;

pub use auth::{Authenticator, LocalUserAuth, NoAuth, TokenAuth};
pub use catalyst_core::{Error, StreamEvent, Subscription};
pub use client::{CatalystClient, CatalystClientBuilder};
