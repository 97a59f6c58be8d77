//! Authentication strategies for the Catalyst API.
//!
//! An [`Authenticator`] is a capability, not a middleware: the transport asks
//! it whether credentials need refreshing and, if so, lets it act on the
//! shared request state (default headers, cookie jar). All attempts are
//! serialized through one mutex owned by the transport, so a storm of
//! concurrent 401s triggers at most one re-authentication while the other
//! callers wait on that same attempt.

use catalyst_core::Error;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use std::time::Duration;
use url::Url;

/// Session cookie the backend issues after a successful password login.
const SESSION_COOKIE: &str = "_sid";

/// Delay before retrying a rate-limited login attempt.
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(10);

/// Shared request state an authenticator may inspect and mutate.
pub struct AuthContext<'a> {
    /// HTTP client for performing login calls
    pub http: &'a reqwest::Client,
    /// Absolute API base URL
    pub base_url: &'a Url,
    /// Default headers attached to every request
    pub headers: &'a RwLock<HeaderMap>,
    /// Cookie jar shared with the HTTP client
    pub cookies: &'a Jar,
}

impl AuthContext<'_> {
    fn has_session_cookie(&self) -> bool {
        let Some(header) = self.cookies.cookies(self.base_url) else {
            return false;
        };
        let Ok(cookies) = header.to_str() else {
            return false;
        };
        cookies.split(';').any(|pair| {
            pair.trim_start()
                .strip_prefix(SESSION_COOKIE)
                .is_some_and(|rest| rest.starts_with('='))
        })
    }
}

/// Boxed future returned by [`Authenticator`] methods.
///
/// Explicit `Pin<Box<dyn Future>>` returns keep the trait dyn-compatible so a
/// client can hold `Arc<dyn Authenticator>`.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An authentication strategy.
pub trait Authenticator: Send + Sync {
    /// Run the authentication procedure against the backend.
    ///
    /// Returns `Ok(true)` when the session is authenticated afterwards.
    ///
    /// # Errors
    ///
    /// Returns connection-level errors from the login call itself.
    fn authenticate<'a>(&'a self, ctx: AuthContext<'a>) -> AuthFuture<'a, Result<bool, Error>>;

    /// Whether the credentials need (re)applying before the next request.
    fn should_update<'a>(&'a self, ctx: AuthContext<'a>) -> AuthFuture<'a, bool>;
}

/// No authentication (noop). Suitable for local development backends.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuth;

impl Authenticator for NoAuth {
    fn authenticate<'a>(&'a self, _ctx: AuthContext<'a>) -> AuthFuture<'a, Result<bool, Error>> {
        Box::pin(async { Ok(true) })
    }

    fn should_update<'a>(&'a self, _ctx: AuthContext<'a>) -> AuthFuture<'a, bool> {
        Box::pin(async { false })
    }
}

/// Bearer-token authentication.
///
/// Writes an `Authorization` header into the shared header slot; reapplied on
/// every authentication cycle so a forced refresh after a 401 restores it.
#[derive(Clone, Debug)]
pub struct TokenAuth {
    token: String,
}

impl TokenAuth {
    /// Create a token authenticator.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Authenticator for TokenAuth {
    fn authenticate<'a>(&'a self, ctx: AuthContext<'a>) -> AuthFuture<'a, Result<bool, Error>> {
        Box::pin(async move {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|err| Error::Config(format!("invalid auth token: {err}")))?;
            value.set_sensitive(true);
            if let Ok(mut headers) = ctx.headers.write() {
                headers.insert(AUTHORIZATION, value);
            }
            Ok(true)
        })
    }

    fn should_update<'a>(&'a self, _ctx: AuthContext<'a>) -> AuthFuture<'a, bool> {
        Box::pin(async { true })
    }
}

/// Email/password authentication against `v0/auth`.
///
/// The backend answers a successful login with the `_sid` session cookie; its
/// presence in the jar decides whether a refresh is needed.
#[derive(Clone)]
pub struct LocalUserAuth {
    email: String,
    password: String,
}

impl LocalUserAuth {
    /// Create a password authenticator.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        tracing::warn!("password based authentication is intended for testing only");
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LocalUserAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalUserAuth")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Authenticator for LocalUserAuth {
    fn authenticate<'a>(&'a self, ctx: AuthContext<'a>) -> AuthFuture<'a, Result<bool, Error>> {
        Box::pin(async move {
            let url = ctx
                .base_url
                .join("v0/auth")
                .map_err(|err| Error::Config(err.to_string()))?;
            loop {
                let response = ctx
                    .http
                    .post(url.clone())
                    .json(&serde_json::json!({
                        "email": self.email,
                        "password": self.password,
                    }))
                    .send()
                    .await
                    .map_err(|err| Error::Connection(err.to_string()))?;

                if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    tokio::time::sleep(RATE_LIMIT_DELAY).await;
                    continue;
                }
                let ok = response.status().is_success();
                return Ok(ok && ctx.has_session_cookie());
            }
        })
    }

    fn should_update<'a>(&'a self, ctx: AuthContext<'a>) -> AuthFuture<'a, bool> {
        Box::pin(async move { !ctx.has_session_cookie() })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn context<'a>(
        http: &'a reqwest::Client,
        base_url: &'a Url,
        headers: &'a RwLock<HeaderMap>,
        cookies: &'a Jar,
    ) -> AuthContext<'a> {
        AuthContext {
            http,
            base_url,
            headers,
            cookies,
        }
    }

    #[tokio::test]
    async fn no_auth_never_updates() {
        let http = reqwest::Client::new();
        let base_url = Url::parse("http://localhost:3000/").unwrap();
        let headers = RwLock::new(HeaderMap::new());
        let cookies = Jar::default();

        let auth = NoAuth;
        assert!(!auth.should_update(context(&http, &base_url, &headers, &cookies)).await);
        assert!(
            auth.authenticate(context(&http, &base_url, &headers, &cookies))
                .await
                .unwrap()
        );
        assert!(headers.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_auth_sets_bearer_header() {
        let http = reqwest::Client::new();
        let base_url = Url::parse("http://localhost:3000/").unwrap();
        let headers = RwLock::new(HeaderMap::new());
        let cookies = Jar::default();

        let auth = TokenAuth::new("secret-token");
        assert!(auth.should_update(context(&http, &base_url, &headers, &cookies)).await);
        assert!(
            auth.authenticate(context(&http, &base_url, &headers, &cookies))
                .await
                .unwrap()
        );

        let stored = headers.read().unwrap();
        let value = stored.get(AUTHORIZATION).unwrap();
        assert!(value.is_sensitive());
    }

    #[tokio::test]
    async fn local_user_auth_wants_update_without_cookie() {
        let http = reqwest::Client::new();
        let base_url = Url::parse("http://localhost:3000/").unwrap();
        let headers = RwLock::new(HeaderMap::new());
        let cookies = Jar::default();

        let auth = LocalUserAuth::new("user@example.com", "hunter2");
        assert!(auth.should_update(context(&http, &base_url, &headers, &cookies)).await);

        cookies.add_cookie_str("_sid=abc; Path=/", &base_url);
        assert!(!auth.should_update(context(&http, &base_url, &headers, &cookies)).await);
    }

    #[test]
    fn authenticator_is_object_safe() {
        let _auth: Arc<dyn Authenticator> = Arc::new(NoAuth);
        let _auth: Arc<dyn Authenticator> = Arc::new(TokenAuth::new("t"));
    }
}
