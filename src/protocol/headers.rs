//! Header formatting and version-tag extraction for the portal API.
//!
//! # Header Formats
//!
//! | Header | Format | Example |
//! |--------|--------|---------|
//! | Authorization | `Bearer {token}` | `Bearer eyJhbGciOi...` |
//! | If-Match | Opaque etag, verbatim | `"3f2a9c"` or `3f2a9c` |
//! | ETag | Opaque etag, verbatim | `"3f2a9c"` |
//!
//! # Examples
//!
//! ```
//! use trial_portal_client::protocol::{format_bearer, format_if_match, extract_etag};
//! use serde_json::json;
//!
//! assert_eq!(format_bearer("abc").as_deref(), Some("Bearer abc"));
//! assert_eq!(format_bearer(""), None);
//!
//! assert_eq!(format_if_match("v2"), "v2");
//!
//! let body = json!({ "trial_id": "10021", "_etag": "v2" });
//! assert_eq!(extract_etag(&body, "_etag").as_deref(), Some("v2"));
//! ```

use http::HeaderMap;
use serde_json::Value;
use std::collections::BTreeMap;

/// Format the `Authorization` header value for a bearer token.
///
/// Returns `None` for an empty or whitespace-only token, meaning the request is
/// sent unauthenticated. Any other token is sent exactly as given.
///
/// # Examples
///
/// ```
/// use trial_portal_client::protocol::format_bearer;
///
/// assert_eq!(format_bearer("token-1").unwrap(), "Bearer token-1");
/// assert!(format_bearer("   ").is_none());
/// ```
pub fn format_bearer(token: &str) -> Option<String> {
    if token.trim().is_empty() {
        None
    } else {
        Some(format!("Bearer {}", token))
    }
}

/// Format the `If-Match` header value.
///
/// Etags are opaque: quotes are neither added nor stripped, so the server sees
/// exactly the tag it handed out.
#[inline]
pub fn format_if_match(etag: &str) -> String {
    etag.to_string()
}

/// Read the version tag of a fetched resource from its JSON body.
///
/// Only string fields are accepted; a missing, null or non-string field yields `None`.
pub fn extract_etag(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Convert response headers to a map keyed by lower-cased header name.
///
/// Values that are not valid visible ASCII are skipped. Repeated headers keep
/// the last value.
pub fn headers_to_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (k, v) in headers {
        if let Ok(val) = v.to_str() {
            map.insert(k.as_str().to_ascii_lowercase(), val.to_string());
        }
    }
    map
}
