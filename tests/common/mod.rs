//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::time::Duration;
use trial_portal_client::{ApiClient, ClientConfig, ConflictPolicy};

pub const TOKEN: &str = "test-token";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Client rooted at the mock server, with backoff short enough for tests.
pub fn fast_client(base_url: &str) -> ApiClient {
    let config = ClientConfig::default()
        .with_base_url(base_url)
        .with_logging(true)
        .with_conflict_policy(
            ConflictPolicy::default()
                .with_base_delay(Duration::from_millis(5))
                .with_max_delay(Duration::from_millis(20)),
        );
    ApiClient::with_config(config).expect("client config is valid")
}

/// Client with the production retry policy.
pub fn default_client(base_url: &str) -> ApiClient {
    ApiClient::with_config(ClientConfig::default().with_base_url(base_url))
        .expect("client config is valid")
}
