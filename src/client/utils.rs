//! Utility functions for the portal API client.
//!
//! This module provides helpers for:
//! - Resolving resource paths against the configured base URL
//! - Encoding header names and values
//! - Status code classification
//! - Sleeping between retries

use crate::error::{ApiError, Result};
use crate::protocol::CONFLICT_STATUS;
use http::header::{HeaderName, HeaderValue};
use std::time::Duration;
use url::Url;

/// Resolve a resource path to an absolute URL.
///
/// Absolute URLs are returned unchanged. Relative paths are joined onto `base`;
/// a leading `/` on the path is relative to the base path, not the host root, so
/// `https://host/api/` + `/trials` gives `https://host/api/trials`.
///
/// # Examples
///
/// ```
/// use trial_portal_client::client::resolve_url;
/// use url::Url;
///
/// let base = Url::parse("https://portal.example.org/api/").unwrap();
/// assert_eq!(
///     resolve_url(Some(&base), "trial_metadata/10021").unwrap(),
///     "https://portal.example.org/api/trial_metadata/10021"
/// );
/// assert_eq!(
///     resolve_url(Some(&base), "http://other/x").unwrap(),
///     "http://other/x"
/// );
/// assert!(resolve_url(None, "/users").is_err());
/// ```
pub fn resolve_url(base: Option<&Url>, url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ApiError::InvalidUrl("empty URL".to_string()));
    }

    match Url::parse(url) {
        Ok(absolute) => Ok(absolute.into()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or_else(|| {
                ApiError::InvalidUrl(format!("relative URL without base URL: {}", url))
            })?;
            base.join(url.trim_start_matches('/'))
                .map(Into::into)
                .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", url, e)))
        }
        Err(e) => Err(ApiError::InvalidUrl(format!("{}: {}", url, e))),
    }
}

/// Parse a base URL, making sure it ends with `/` so joins append to its path.
pub fn parse_base_url(base: &str) -> Result<Url> {
    let mut base = base.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).map_err(|e| ApiError::Config(format!("invalid base URL {}: {}", base, e)))
}

/// Encode a header value, rejecting control characters.
pub fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ApiError::InvalidHeader(e.to_string()))
}

/// Encode a header name.
pub fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ApiError::InvalidHeader(format!("{}: {}", name, e)))
}

/// Check if status code signals an etag mismatch
#[inline]
pub fn is_conflict_status(status: u16) -> bool {
    status == CONFLICT_STATUS
}

/// Sleep for the given backoff delay.
pub async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
