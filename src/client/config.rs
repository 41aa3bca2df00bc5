//! Configuration for the portal API client.
//!
//! # Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `base_url` | `None` | Prefix for relative resource paths |
//! | `request_timeout_ms` | 30000 | Whole-request timeout |
//! | `connect_timeout_ms` | 10000 | Connection establishment timeout |
//! | `proxy_url` | `""` | Proxy for all requests (empty = none) |
//! | `user_agent` | `trial-portal-client/<version>` | `User-Agent` header |
//! | `pool_idle_timeout_secs` | 90 | Idle connection lifetime |
//! | `enable_logging` | false | Warn-level logging of conflict retries |
//! | `conflict` | see [`ConflictPolicy`] | Refetch-and-retry policy for 412s |
//!
//! The struct deserializes with per-field defaults, so a host application can
//! embed it in its own settings file and only spell out what it overrides.
//!
//! # Examples
//!
//! ```
//! use trial_portal_client::client::ClientConfig;
//!
//! let config = ClientConfig {
//!     base_url: Some("https://api.example.org/".into()),
//!     ..Default::default()
//! };
//! assert_eq!(config.request_timeout_ms, 30000);
//! assert_eq!(config.conflict.max_retries, 5);
//! ```
//!
//! ```
//! use trial_portal_client::client::ClientConfig;
//!
//! let config: ClientConfig =
//!     serde_json::from_str(r#"{ "enable_logging": true }"#).unwrap();
//! assert!(config.enable_logging);
//! assert_eq!(config.pool_idle_timeout_secs, 90);
//! ```

use crate::client::retry::ConflictPolicy;
use serde::{Deserialize, Serialize};

/// Configuration for the portal API client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL that relative resource paths are joined onto.
    ///
    /// Absolute URLs passed to the client are used verbatim.
    pub base_url: Option<String>,

    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Proxy URL (optional).
    ///
    /// If set, requests will be routed through this proxy.
    pub proxy_url: String,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// How long idle pooled connections are kept, in seconds.
    pub pool_idle_timeout_secs: u64,

    /// Enable request logging.
    ///
    /// When enabled, conflict retries, give-ups and refetches without a version
    /// tag are reported at warn level using the `tracing` crate. Per-request debug events are always emitted.
    pub enable_logging: bool,

    /// Refetch-and-retry policy for conditional updates and deletes.
    pub conflict: ConflictPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: None,
            request_timeout_ms: 30000,
            connect_timeout_ms: 10000,
            proxy_url: String::new(),
            user_agent: format!("trial-portal-client/{}", env!("CARGO_PKG_VERSION")),
            pool_idle_timeout_secs: 90,
            enable_logging: false,
            conflict: ConflictPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL for relative paths.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    /// Route requests through a proxy.
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = proxy_url.into();
        self
    }

    /// Enable or disable warn-level retry logging.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Replace the conflict retry policy.
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict = policy;
        self
    }
}
