//! HTTP transport: plain request/response calls with auth-aware retry.
//!
//! Wire JSON uses `camelCase`; everything above this layer uses `snake_case`.
//! The transport translates both ways, so callers and DTOs never see wire
//! casing. Retry policy per request: one re-authenticated retry after a 401,
//! unbounded retries after 429 with a fixed delay. Everything else maps to a
//! typed error.

use crate::auth::{AuthContext, Authenticator};
use catalyst_core::Error;
use catalyst_core::convert::{keys_to_camel, keys_to_snake};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Delay before retrying a rate-limited request.
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(10);

/// Shared HTTP layer under the namespaces and the connection manager.
pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: Url,
    headers: RwLock<HeaderMap>,
    cookies: Arc<Jar>,
    auth: Arc<dyn Authenticator>,
    auth_lock: Mutex<()>,
    timeout: Option<Duration>,
}

impl Transport {
    pub(crate) fn new(
        base_url: Url,
        auth: Arc<dyn Authenticator>,
        timeout: Option<Duration>,
        user_agent: &str,
        default_headers: HeaderMap,
    ) -> Result<Self, Error> {
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "base URL must be absolute and hierarchical: {base_url}"
            )));
        }
        // Joins below are relative; a missing trailing slash would silently
        // drop the last path segment.
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let cookies = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .cookie_provider(Arc::clone(&cookies))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| Error::Config(err.to_string()))?;

        Ok(Self {
            http,
            base_url,
            headers: RwLock::new(default_headers),
            cookies,
            auth,
            auth_lock: Mutex::new(()),
            timeout,
        })
    }

    pub(crate) const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| Error::Config(format!("invalid path {path:?}: {err}")))
    }

    fn auth_context(&self) -> AuthContext<'_> {
        AuthContext {
            http: &self.http,
            base_url: &self.base_url,
            headers: &self.headers,
            cookies: &self.cookies,
        }
    }

    fn header_snapshot(&self) -> HeaderMap {
        self.headers.read().map(|h| h.clone()).unwrap_or_default()
    }

    /// Run the authentication cycle if required.
    ///
    /// Serialized through one mutex: concurrent callers wait for the attempt
    /// already in flight instead of re-authenticating independently.
    pub(crate) async fn ensure_auth(&self, force: bool) -> Result<(), Error> {
        let _guard = self.auth_lock.lock().await;
        if force || self.auth.should_update(self.auth_context()).await {
            let ok = self.auth.authenticate(self.auth_context()).await?;
            if !ok {
                warn!("authentication attempt was not accepted by the server");
            }
        }
        Ok(())
    }

    /// Whether an authentication attempt is currently in flight.
    fn auth_in_flight(&self) -> bool {
        self.auth_lock.try_lock().is_err()
    }

    /// Perform one JSON API call and return the normalized response body.
    ///
    /// The request body's keys are camelized for the wire; the response
    /// body's keys are snake-cased. Non-JSON responses yield `Value::Null`.
    pub(crate) async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        auth_required: bool,
    ) -> Result<Value, Error> {
        let url = self.url(path)?;
        let wire_body = body.map(keys_to_camel);

        if auth_required {
            self.ensure_auth(false).await?;
        }

        let mut reauthenticated = false;
        loop {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .headers(self.header_snapshot());
            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }
            if let Some(body) = &wire_body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(map_send_error)?;
            match response.status() {
                StatusCode::UNAUTHORIZED if !reauthenticated => {
                    reauthenticated = true;
                    // Force a fresh cycle only when nobody else is already
                    // authenticating; otherwise wait for that attempt.
                    let force = !self.auth_in_flight();
                    self.ensure_auth(force).await?;
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    debug!(%url, "rate limited, retrying in {:?}", RATE_LIMIT_DELAY);
                    tokio::time::sleep(RATE_LIMIT_DELAY).await;
                }
                _ => return read_json_response(response).await,
            }
        }
    }

    /// Lightweight keep-alive request; the result only matters for logging.
    pub(crate) async fn ping(&self) -> Result<(), Error> {
        let url = self.url("v0")?;
        let response = self
            .http
            .head(url)
            .headers(self.header_snapshot())
            .send()
            .await
            .map_err(map_send_error)?;
        debug!(status = %response.status(), "ping");
        Ok(())
    }

    /// Open the server-push stream endpoint.
    ///
    /// No read timeout: the stream is expected to idle between records. The
    /// caller classifies the response status.
    pub(crate) async fn open_stream(&self) -> Result<reqwest::Response, Error> {
        let url = self.url("stream")?;
        self.http
            .get(url)
            .headers(self.header_snapshot())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(map_send_error)
    }
}

pub(crate) fn map_send_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(err.to_string())
    } else {
        Error::Connection(err.to_string())
    }
}

/// Map status and body to a result: JSON bodies are key-normalized, error
/// statuses become typed errors carrying the body's `error` field (or the
/// text body) as message.
async fn read_json_response(response: reqwest::Response) -> Result<Value, Error> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    let text = response
        .text()
        .await
        .map_err(|err| Error::Decode(err.to_string()))?;

    let body = if is_json && !text.is_empty() {
        let value: Value =
            serde_json::from_str(&text).map_err(|err| Error::Decode(err.to_string()))?;
        keys_to_snake(value)
    } else {
        Value::Null
    };

    if status.is_client_error() || status.is_server_error() {
        let message = body
            .get("error")
            .map(value_to_message)
            .filter(|message| !message.is_empty())
            .unwrap_or(text);
        return Err(Error::from_status(status.as_u16(), message));
    }

    Ok(body)
}

fn value_to_message(value: &Value) -> String {
    match value {
        Value::String(message) => message.clone(),
        other => other.to_string(),
    }
}
