//! Main portal API client implementation.
//!
//! Provides [`ApiClient`], which performs authenticated reads and writes and
//! transparently resolves etag conflicts on conditional updates and deletes.
//!
//! # Examples
//!
//! ## Reading a resource
//!
//! ```ignore
//! use trial_portal_client::ApiClient;
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new();
//!     let trial: Value = client
//!         .fetch("https://api.example.org/trial_metadata/10021", &token)
//!         .await?;
//!     println!("etag: {}", trial["_etag"]);
//!     Ok(())
//! }
//! ```
//!
//! ## Conditional update
//!
//! ```ignore
//! use trial_portal_client::{ApiClient, UpdateOptions};
//! use serde_json::{json, Value};
//!
//! let updated: Value = client
//!     .update(
//!         "https://api.example.org/users/42",
//!         &token,
//!         UpdateOptions::new(json!({ "role": "cimac-user" })).with_etag(etag),
//!     )
//!     .await?;
//! ```
//!
//! If someone else modified the user in the meantime, the client refetches it,
//! retries with the fresh etag and only reports a 412 once its retry budget is
//! spent.

use crate::client::options::{CreateOptions, DeleteOptions, FetchOptions, UpdateOptions};
use crate::client::retry::{Phase, RetryDecision, RetryState};
use crate::client::transport::{ReqwestTransport, Transport};
use crate::client::{config::ClientConfig, utils};
use crate::error::Result;
use crate::types::{ApiRequest, ApiResponse, ResponseBody};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

/// HTTP client for the portal API.
///
/// Cloning is cheap; clones share the transport and configuration. The client
/// holds no per-call state: every update or delete owns its own retry counter,
/// so concurrent calls never interfere.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
    base_url: Option<Url>,
}

impl ApiClient {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        let config = ClientConfig::default();
        let transport = ReqwestTransport::from_config(&config).unwrap_or_default();

        ApiClient {
            transport: Arc::new(transport),
            config: Arc::new(config),
            base_url: None,
        }
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::from_config(&config)?;
        Self::with_transport(Arc::new(transport), config)
    }

    /// Create a client on top of any [`Transport`].
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(utils::parse_base_url)
            .transpose()?;

        Ok(ApiClient {
            transport,
            config: Arc::new(config),
            base_url,
        })
    }

    /// Read a JSON resource.
    ///
    /// No retry: conflicts are meaningless for reads.
    pub async fn fetch<T: DeserializeOwned>(&self, url: &str, bearer_token: &str) -> Result<T> {
        let response = self
            .fetch_with(url, bearer_token, FetchOptions::default())
            .await?;
        decode_json(&response)
    }

    /// Read a resource, returning status, headers and the raw body.
    pub async fn fetch_with(
        &self,
        url: &str,
        bearer_token: &str,
        options: FetchOptions,
    ) -> Result<ApiResponse> {
        let mut request = ApiRequest::get(self.resolve(url)?, bearer_token);
        request.headers = options.headers;
        request.query = options.query;
        self.send(&request).await
    }

    /// Read a resource decoded as `options.response_type` asks.
    pub async fn fetch_decoded(
        &self,
        url: &str,
        bearer_token: &str,
        options: FetchOptions,
    ) -> Result<ResponseBody> {
        let response_type = options.response_type;
        self.fetch_with(url, bearer_token, options)
            .await?
            .decode(response_type)
    }

    /// Create a resource with a POST.
    pub async fn create<T: DeserializeOwned>(
        &self,
        url: &str,
        bearer_token: &str,
        options: CreateOptions,
    ) -> Result<T> {
        let request = ApiRequest::post(self.resolve(url)?, bearer_token).with_payload(options.data);
        let response = self.send(&request).await?;
        decode_json(&response)
    }

    /// Update a resource with a PATCH.
    ///
    /// With an etag the request is conditional and a 412 is resolved by
    /// refetching and retrying.
    pub async fn update<T: DeserializeOwned>(
        &self,
        url: &str,
        bearer_token: &str,
        options: UpdateOptions,
    ) -> Result<T> {
        let mut request =
            ApiRequest::patch(self.resolve(url)?, bearer_token).with_payload(options.data);
        if let Some(etag) = options.etag {
            request = request.with_if_match(etag);
        }
        let response = self.send_conditional(request).await?;
        decode_json(&response)
    }

    /// Delete a resource.
    ///
    /// Resolves with the raw success response; delete bodies are usually empty.
    pub async fn delete(
        &self,
        url: &str,
        bearer_token: &str,
        options: DeleteOptions,
    ) -> Result<ApiResponse> {
        let mut request = ApiRequest::delete(self.resolve(url)?, bearer_token);
        if let Some(etag) = options.etag {
            request = request.with_if_match(etag);
        }
        self.send_conditional(request).await
    }

    /// Send a mutation, resolving etag conflicts by refetch-and-retry.
    async fn send_conditional(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        let policy = &self.config.conflict;
        let mut state = RetryState::new(policy, request.if_match.clone());

        loop {
            state.enter(Phase::Sending);
            let err = match self.send(&request).await {
                Ok(response) => {
                    state.enter(Phase::Success);
                    return Ok(response);
                }
                Err(e) => e,
            };

            // Unconditional requests never asked for conflict semantics.
            if !(err.is_conflict() && request.is_conditional()) {
                state.enter(Phase::Failed);
                return Err(err);
            }

            state.enter(Phase::Conflict);
            let delay = match state.on_conflict() {
                RetryDecision::Retry(delay) => delay,
                RetryDecision::GiveUp => {
                    if self.config.enable_logging {
                        tracing::warn!(
                            "Conflict on {} {} not resolved after {} retries",
                            request.method,
                            request.url,
                            state.attempt()
                        );
                    }
                    state.enter(Phase::Failed);
                    return Err(err);
                }
            };

            state.enter(Phase::Refetching);
            let current = match self.send(&request.refetch()).await {
                Ok(current) => current,
                Err(refetch_err) => {
                    state.enter(Phase::Failed);
                    return Err(refetch_err);
                }
            };
            let Some(version) = current.version_tag(&policy.etag_field) else {
                if self.config.enable_logging {
                    tracing::warn!(
                        "Refetch of {} returned no version tag in `{}` or ETag",
                        request.url,
                        policy.etag_field
                    );
                }
                state.enter(Phase::Failed);
                return Err(err);
            };

            if self.config.enable_logging {
                tracing::warn!(
                    "Conflict on {} {} (attempt {}), retrying with etag {} after {:?}",
                    request.method,
                    request.url,
                    state.attempt(),
                    version,
                    delay
                );
            }
            state.bind_version(version.clone());
            request.if_match = Some(version);
            utils::sleep(delay).await;
        }
    }

    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            conditional = request.is_conditional(),
            "sending request"
        );
        self.transport.send(request).await
    }

    fn resolve(&self, url: &str) -> Result<String> {
        utils::resolve_url(self.base_url.as_ref(), url)
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Decode a JSON body; an empty body decodes as JSON `null` so `()` and
/// `Option<T>` targets accept `204 No Content`.
fn decode_json<T: DeserializeOwned>(response: &ApiResponse) -> Result<T> {
    if response.is_empty() {
        Ok(serde_json::from_slice(b"null")?)
    } else {
        response.json()
    }
}
