//! Error types shared by the correlation engine and the API client.

use thiserror::Error;

/// Errors surfaced to Catalyst API callers.
///
/// Server-reported failures map from their HTTP-style status code via
/// [`Error::from_status`]; everything else describes a client-side condition.
#[derive(Debug, Error)]
pub enum Error {
    /// Requested resource does not exist (404)
    #[error("not found (status {status}): {message}")]
    NotFound {
        /// Status code reported by the server
        status: u16,
        /// Error message from the server
        message: String,
    },

    /// Request payload was rejected (400)
    #[error("invalid payload (status {status}): {message}")]
    Payload {
        /// Status code reported by the server
        status: u16,
        /// Error message from the server
        message: String,
    },

    /// Account quota exceeded (402)
    #[error("quota exceeded (status {status}): {message}")]
    Quota {
        /// Status code reported by the server
        status: u16,
        /// Error message from the server
        message: String,
    },

    /// Authentication missing, expired, or rejected (401/403)
    #[error("authentication failed (status {status}): {message}")]
    Authentication {
        /// Status code reported by the server
        status: u16,
        /// Error message from the server
        message: String,
    },

    /// Any other server-reported error
    #[error("API error (status {status}): {message}")]
    Api {
        /// Status code reported by the server
        status: u16,
        /// Error message from the server
        message: String,
    },

    /// Connection-level failure (refused, reset, DNS, TLS)
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request or stream read timed out
    #[error("timeout: {0}")]
    Timeout(String),

    /// Response body could not be decoded
    #[error("decode failed: {0}")]
    Decode(String),

    /// The event stream ended before a matching event arrived
    #[error("stream closed before a matching event arrived")]
    Cancelled,

    /// Client was constructed with invalid settings
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Map a server-reported status code to the matching error variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound { status, message },
            400 => Self::Payload { status, message },
            402 => Self::Quota { status, message },
            401 | 403 => Self::Authentication { status, message },
            _ => Self::Api { status, message },
        }
    }

    /// Server-reported status code, if this error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { status, .. }
            | Self::Payload { status, .. }
            | Self::Quota { status, .. }
            | Self::Authentication { status, .. }
            | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
