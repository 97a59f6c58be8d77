//! Account endpoints.

use crate::transport::Transport;
use crate::types::User;
use catalyst_core::Error;
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;

const BASE: &str = "v0/auth";

/// Login and account-introspection endpoints.
pub struct Auth {
    transport: Arc<Transport>,
}

impl Auth {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Log in with email and password.
    ///
    /// On success the server sets the session cookie on the shared cookie
    /// jar, so subsequent requests are authenticated. Returns whether the
    /// credentials were accepted; rejections surface as errors.
    pub async fn login(&self, email: &str, password: &str) -> Result<bool, Error> {
        let body = json!({"email": email, "password": password});
        self.transport
            .request_json(Method::POST, BASE, Some(body), false)
            .await?;
        Ok(true)
    }

    /// The account the current session belongs to.
    pub async fn whoami(&self) -> Result<User, Error> {
        let value = self
            .transport
            .request_json(Method::GET, BASE, None, true)
            .await?;
        serde_json::from_value(value).map_err(|err| Error::Decode(err.to_string()))
    }
}
