//! Per-call options for the four client operations.

use crate::types::{Payload, ResponseType};
use std::collections::BTreeMap;

/// Transport-level overrides for a read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    /// How the caller wants the body decoded by [`ApiClient::fetch_decoded`](crate::client::ApiClient::fetch_decoded).
    pub response_type: ResponseType,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Query parameters appended to the URL.
    pub query: Vec<(String, String)>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// Body of a POST.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOptions {
    pub data: Payload,
}

impl CreateOptions {
    pub fn new(data: impl Into<Payload>) -> Self {
        Self { data: data.into() }
    }
}

/// Body and optional version tag of a PATCH.
///
/// Without an etag the update is unconditional and a 412 is never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOptions {
    pub data: Payload,
    pub etag: Option<String>,
}

impl UpdateOptions {
    pub fn new(data: impl Into<Payload>) -> Self {
        Self {
            data: data.into(),
            etag: None,
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

/// Optional version tag of a DELETE.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOptions {
    pub etag: Option<String>,
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}
