//! HTTP transport used by [`ApiClient`](crate::client::ApiClient).
//!
//! The client never touches the network itself; it hands an [`ApiRequest`] to a
//! [`Transport`] and gets back either a 2xx [`ApiResponse`] or an [`ApiError`].
//! [`ReqwestTransport`] is the production implementation. Tests and host
//! applications can plug in their own.

use crate::client::config::ClientConfig;
use crate::client::utils::{header_name, header_value};
use crate::error::{ApiError, Result};
use crate::protocol::{self, constants::headers, JSON_CONTENT_TYPE};
use crate::types::{ApiRequest, ApiResponse, Payload};
use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use std::time::Duration;
use tracing::debug;

/// Abstraction over the HTTP layer.
///
/// Contract:
/// - `Ok` only for 2xx responses.
/// - A non-2xx response is `Err(ApiError::Status { status, data, headers })`.
/// - No response at all is `Err(ApiError::Network(_))` or `Err(ApiError::Timeout)`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and wait for its response.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Build the headers of a request: `Authorization`, `If-Match`, the JSON
/// `Content-Type` and any caller-supplied extras.
///
/// Multipart forms get their `Content-Type` (with boundary) from the form
/// itself, so none is set here.
pub fn build_headers(request: &ApiRequest) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();

    for (k, v) in &request.headers {
        map.insert(header_name(k)?, header_value(v)?);
    }

    if let Some(bearer) = protocol::format_bearer(&request.bearer_token) {
        map.insert(headers::AUTHORIZATION, header_value(&bearer)?);
    }
    if let Some(etag) = &request.if_match {
        map.insert(headers::IF_MATCH, header_value(&protocol::format_if_match(etag))?);
    }
    if let Some(Payload::Json(_)) = &request.payload {
        map.insert(headers::CONTENT_TYPE, header_value(JSON_CONTENT_TYPE)?);
    }

    Ok(map)
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wrap an existing reqwest client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a reqwest client from the client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .user_agent(config.user_agent.clone());

        if !config.proxy_url.is_empty() {
            let proxy = reqwest::Proxy::all(&config.proxy_url)
                .map_err(|e| ApiError::Config(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Get the underlying reqwest client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut req_builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(build_headers(request)?);

        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }

        match &request.payload {
            Some(json @ Payload::Json(_)) => {
                if let Some(body) = json.to_json_bytes()? {
                    req_builder = req_builder.body(body);
                }
            }
            Some(Payload::Form(form)) => {
                req_builder = req_builder.multipart(form.to_multipart()?);
            }
            None => {}
        }

        let response = req_builder.send().await?;

        let status = response.status().as_u16();
        let headers = protocol::headers_to_map(response.headers());
        let body: Bytes = response.bytes().await?;

        debug!(method = %request.method, url = %request.url, status, "response received");

        if !(200..300).contains(&status) {
            return Err(ApiError::Status {
                status,
                data: String::from_utf8_lossy(&body).into_owned(),
                headers,
            });
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
