//! The client session: one transport, one stream manager, the namespaces.

use crate::auth::{Authenticator, NoAuth};
use crate::namespaces::{Auth, Calculations, Collections, DataSources};
use crate::stream::StreamManager;
use crate::transport::Transport;
use catalyst_core::hub::Predicate;
use catalyst_core::{Error, Subscription};
use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const DEFAULT_USER_AGENT: &str = concat!("catalyst-client/", env!("CARGO_PKG_VERSION"));

/// A connected client session.
///
/// Owns the HTTP transport and the lazily started event-stream manager;
/// namespaces borrow both. All methods take `&self`, so one session can be
/// shared behind an `Arc` across tasks.
///
/// # Examples
///
/// ```no_run
/// use catalyst_client::{CatalystClient, TokenAuth};
///
/// # async fn run() -> Result<(), catalyst_core::Error> {
/// let client = CatalystClient::builder("https://api.example.org")?
///     .auth(TokenAuth::new("secret"))
///     .build()?;
/// let source = client.datasources().create("data...", None, None).await?;
/// client.close();
/// # Ok(())
/// # }
/// ```
pub struct CatalystClient {
    transport: Arc<Transport>,
    stream: Arc<StreamManager>,
}

impl CatalystClient {
    /// Start building a session against the given absolute base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the URL does not parse.
    pub fn builder(base_url: &str) -> Result<CatalystClientBuilder, Error> {
        let base_url = Url::parse(base_url)
            .map_err(|err| Error::Config(format!("invalid base URL {base_url:?}: {err}")))?;
        Ok(CatalystClientBuilder {
            base_url,
            auth: Arc::new(NoAuth),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: HeaderMap::new(),
        })
    }

    /// Data source endpoints.
    #[must_use]
    pub fn datasources(&self) -> DataSources {
        DataSources::new(Arc::clone(&self.transport), Arc::clone(&self.stream))
    }

    /// Calculation endpoints.
    #[must_use]
    pub fn calculations(&self) -> Calculations {
        Calculations::new(Arc::clone(&self.transport), Arc::clone(&self.stream))
    }

    /// Collection endpoints.
    #[must_use]
    pub fn collections(&self) -> Collections {
        Collections::new(Arc::clone(&self.transport), Arc::clone(&self.stream))
    }

    /// Account endpoints.
    #[must_use]
    pub fn auth(&self) -> Auth {
        Auth::new(Arc::clone(&self.transport))
    }

    /// Subscribe to the shared event stream.
    ///
    /// The first subscription lazily opens the physical connection; events
    /// matching the predicate (or all of them, for `None`) are delivered to
    /// the returned handle until it is dropped.
    #[must_use]
    pub fn subscribe(&self, predicate: Option<Predicate>) -> Subscription {
        self.stream.subscribe(predicate)
    }

    /// One keep-alive round trip to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] or [`Error::Timeout`] when the backend
    /// is unreachable.
    pub async fn ping(&self) -> Result<(), Error> {
        self.transport.ping().await
    }

    /// Tear the session down: stop the stream tasks and force-close every
    /// subscription. Idempotent; in-flight correlated calls fail with
    /// [`Error::Cancelled`] instead of hanging.
    pub fn close(&self) {
        self.stream.close();
    }
}

impl std::fmt::Debug for CatalystClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalystClient")
            .field("connected", &self.stream.hub().is_connected())
            .finish_non_exhaustive()
    }
}

/// Builder for [`CatalystClient`].
pub struct CatalystClientBuilder {
    base_url: Url,
    auth: Arc<dyn Authenticator>,
    timeout: Option<Duration>,
    user_agent: String,
    headers: HeaderMap,
}

impl CatalystClientBuilder {
    /// Authentication strategy; defaults to [`NoAuth`].
    #[must_use]
    pub fn auth(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Per-request timeout. Never applied to the event stream.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Extra headers attached to every request.
    #[must_use]
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Build the session and start its background consumer task.
    ///
    /// Must be called inside a tokio runtime. The physical stream stays
    /// closed until the first subscription or correlated call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unusable base URL or HTTP client
    /// configuration.
    pub fn build(self) -> Result<CatalystClient, Error> {
        let transport = Arc::new(Transport::new(
            self.base_url,
            self.auth,
            self.timeout,
            &self.user_agent,
            self.headers,
        )?);
        let stream = Arc::new(StreamManager::new(Arc::clone(&transport)));
        Ok(CatalystClient { transport, stream })
    }
}

impl std::fmt::Debug for CatalystClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalystClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builder_rejects_garbage_url() {
        assert!(matches!(
            CatalystClient::builder("not a url"),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let client = CatalystClient::builder("http://localhost:1")
            .unwrap()
            .build()
            .unwrap();
        client.close();
        client.close();
    }

    #[tokio::test]
    async fn subscribe_after_close_sees_closed_hub() {
        let client = CatalystClient::builder("http://localhost:1")
            .unwrap()
            .build()
            .unwrap();
        client.close();
        let mut subscription = client.subscribe(None);
        assert!(subscription.next().await.is_none());
    }
}
