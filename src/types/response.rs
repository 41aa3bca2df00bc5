//! HTTP response returned by the transport.

use crate::error::Result;
use crate::protocol;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// A successful (2xx) HTTP response.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

/// How the caller expects the response body to be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    Bytes,
}

/// A response body decoded according to a [`ResponseType`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Bytes(Bytes),
    /// The response carried no body (e.g. `204 No Content`).
    Empty,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        ApiResponse {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of the `ETag` response header, verbatim.
    pub fn etag(&self) -> Option<&str> {
        self.header(protocol::constants::headers::ETAG.as_str())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Decode the body the way the caller asked for.
    ///
    /// An empty body decodes to [`ResponseBody::Empty`] whatever the requested type.
    pub fn decode(&self, response_type: ResponseType) -> Result<ResponseBody> {
        if self.body.is_empty() {
            return Ok(ResponseBody::Empty);
        }
        Ok(match response_type {
            ResponseType::Json => ResponseBody::Json(self.json()?),
            ResponseType::Text => ResponseBody::Text(self.text()),
            ResponseType::Bytes => ResponseBody::Bytes(self.bytes()),
        })
    }

    /// Version tag of the returned resource: the body field first, then the
    /// `ETag` header.
    pub fn version_tag(&self, field: &str) -> Option<String> {
        serde_json::from_slice::<Value>(&self.body)
            .ok()
            .and_then(|body| protocol::extract_etag(&body, field))
            .or_else(|| self.etag().map(str::to_string))
    }
}
