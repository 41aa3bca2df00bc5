//! Protocol constants and header helpers for the portal API.
//!
//! The API follows the usual resource-oriented conventions: bearer-token
//! authentication on every request, and optimistic concurrency on mutations via
//! `If-Match`. A stale `If-Match` is answered with `412 Precondition Failed`.
//!
//! | Constant | Value |
//! |----------|-------|
//! | [`CONFLICT_STATUS`] | `412` |
//! | [`DEFAULT_ETAG_FIELD`] | `"_etag"` |
//! | [`JSON_CONTENT_TYPE`] | `"application/json"` |

pub mod headers;

pub use headers::{extract_etag, format_bearer, format_if_match, headers_to_map};

/// Status code signalling an etag mismatch on a conditional request.
pub const CONFLICT_STATUS: u16 = 412;

/// Body field carrying a resource's current version tag.
pub const DEFAULT_ETAG_FIELD: &str = "_etag";

/// Content type of JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Header names used by the client.
pub mod constants {
    /// Header name constants.
    pub mod headers {
        use http::header::HeaderName;

        /// `Authorization`
        pub const AUTHORIZATION: HeaderName = http::header::AUTHORIZATION;
        /// `If-Match`
        pub const IF_MATCH: HeaderName = http::header::IF_MATCH;
        /// `Content-Type`
        pub const CONTENT_TYPE: HeaderName = http::header::CONTENT_TYPE;
        /// `ETag`
        pub const ETAG: HeaderName = http::header::ETAG;
    }
}
