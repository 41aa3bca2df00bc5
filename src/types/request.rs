//! Request descriptor handed to the transport.

use crate::types::Payload;
use http::Method;
use std::collections::BTreeMap;

/// A single HTTP request against the portal API.
///
/// `if_match` is only set on PATCH and DELETE requests whose caller supplied an
/// etag; the client never attaches it to reads or creates.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub bearer_token: String,
    pub payload: Option<Payload>,
    pub if_match: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        ApiRequest {
            method,
            url: url.into(),
            bearer_token: bearer_token.into(),
            payload: None,
            if_match: None,
            headers: BTreeMap::new(),
            query: Vec::new(),
        }
    }

    #[inline]
    pub fn get(url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self::new(Method::GET, url, bearer_token)
    }

    #[inline]
    pub fn post(url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self::new(Method::POST, url, bearer_token)
    }

    #[inline]
    pub fn patch(url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url, bearer_token)
    }

    #[inline]
    pub fn delete(url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url, bearer_token)
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
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

    /// Whether this request carries an `If-Match` precondition.
    #[inline]
    pub fn is_conditional(&self) -> bool {
        self.if_match.is_some()
    }

    /// The GET used to refresh the resource after a conflict.
    ///
    /// Same URL, token and extra headers; no body and no precondition.
    pub fn refetch(&self) -> Self {
        ApiRequest {
            method: Method::GET,
            url: self.url.clone(),
            bearer_token: self.bearer_token.clone(),
            payload: None,
            if_match: None,
            headers: self.headers.clone(),
            query: Vec::new(),
        }
    }
}
