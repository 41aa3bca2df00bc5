//! Portal API client implementation.
//!
//! This module provides the client that front-end data hooks call to read and
//! write portal resources, enabling them to:
//!
//! - **Authenticate** every request with a caller-supplied bearer token
//! - **Send JSON or multipart bodies** chosen explicitly by the caller
//! - **Update and delete conditionally** with `If-Match`
//! - **Resolve etag conflicts** by refetching and retrying with exponential backoff
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── fetch     - ApiClient and its four operations
//! ├── options   - Per-call options (FetchOptions, UpdateOptions, ...)
//! ├── retry     - Conflict retry policy and per-call state machine
//! ├── transport - Transport trait and the reqwest implementation
//! ├── config    - Client configuration
//! └── utils     - Utility functions
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ApiClient`] | fetch / create / update / delete |
//! | [`ConflictPolicy`] | Bounds on the refetch-and-retry cycle |
//! | [`Transport`] | Pluggable HTTP layer |
//! | [`ClientConfig`] | Client configuration options |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use trial_portal_client::client::{ApiClient, ClientConfig, ConflictPolicy};
//! use std::time::Duration;
//!
//! // Default configuration
//! let client = ApiClient::new();
//!
//! // Custom configuration
//! let config = ClientConfig {
//!     base_url: Some("https://api.example.org/".into()),
//!     conflict: ConflictPolicy::default()
//!         .with_max_retries(3)
//!         .with_base_delay(Duration::from_millis(50)),
//!     ..Default::default()
//! };
//! let client = ApiClient::with_config(config).unwrap();
//! ```
//!
//! ## Backoff Schedule
//!
//! ```
//! use trial_portal_client::client::ConflictPolicy;
//! use std::time::Duration;
//!
//! let policy = ConflictPolicy::default();
//! assert_eq!(policy.delay_for(1), Duration::from_millis(100));
//! assert_eq!(policy.delay_for(3), Duration::from_millis(400));
//! assert_eq!(policy.delay_for(10), Duration::from_secs(2));
//! ```

mod config;
mod fetch;
mod options;
pub mod retry;
mod transport;
mod utils;

pub use config::ClientConfig;
pub use fetch::ApiClient;
pub use options::{CreateOptions, DeleteOptions, FetchOptions, UpdateOptions};
pub use retry::{ConflictPolicy, Phase, RetryDecision, RetryState};
pub use transport::{build_headers, ReqwestTransport, Transport};
pub use utils::*;
