//! Error types for portal API operations.
//!
//! Every failure the client can report is an [`ApiError`]. Errors returned by the
//! transport are passed through untouched, so callers can branch on
//! [`ApiError::status()`] exactly as they would on the raw HTTP response.
//!
//! # Error Categories
//!
//! | Category | Variants | Retried by the client |
//! |----------|----------|-----------------------|
//! | HTTP status | `Status` | Only 412 on a conditional update/delete |
//! | Network | `Network`, `Timeout` | No |
//! | Request building | `InvalidUrl`, `InvalidHeader`, `Json` | No |
//! | Configuration | `Config` | No |
//!
//! # Examples
//!
//! ```
//! use trial_portal_client::ApiError;
//! use std::collections::BTreeMap;
//!
//! let err = ApiError::Status {
//!     status: 412,
//!     data: "etag mismatch".into(),
//!     headers: BTreeMap::new(),
//! };
//! assert!(err.is_conflict());
//! assert_eq!(err.status(), Some(412));
//! assert_eq!(err.data(), Some("etag mismatch"));
//! ```

use std::collections::BTreeMap;
use thiserror::Error;

use crate::client::is_conflict_status;

/// Result type for portal API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can occur while talking to the portal API.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    ///
    /// `data` is the response body as text, `headers` the response headers with
    /// lower-cased names.
    #[error("HTTP {status}: {data}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body returned by the server.
        data: String,
        /// Response headers.
        headers: BTreeMap<String, String>,
    },

    /// No response was received (DNS, connection refused, TLS, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The URL is empty, malformed or relative without a base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A header value could not be encoded (e.g. control characters in a token).
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_builder() {
            ApiError::InvalidUrl(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl ApiError {
    /// Build a status error from its parts.
    pub fn status_error(status: u16, data: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            data: data.into(),
            headers: BTreeMap::new(),
        }
    }

    /// HTTP status carried by the error, if a response was received.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body carried by the error, if a response was received.
    #[must_use]
    pub fn data(&self) -> Option<&str> {
        match self {
            ApiError::Status { data, .. } => Some(data.as_str()),
            _ => None,
        }
    }

    /// Whether this is a 412 Precondition Failed response.
    ///
    /// Note that a 412 only triggers the refetch-and-retry cycle when the caller
    /// supplied an etag; otherwise it is an ordinary client error.
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status().is_some_and(is_conflict_status)
    }

    /// Whether no response was received at all.
    #[inline]
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Timeout)
    }

    /// Whether the server answered with a 4xx status.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    /// Whether the server answered with a 5xx status.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(500..=599))
    }
}
