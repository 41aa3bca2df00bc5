#![doc = include_str!("../README.md")]

//! # Portal API client
//!
//! This crate implements the HTTP client that the clinical-trial data portal's
//! front end uses to talk to its resource API: authenticated reads, creates,
//! updates and deletes, with optimistic concurrency on mutations.
//!
//! ## Overview
//!
//! Resources carry a version tag (etag). A caller that read a resource can send
//! that tag back as `If-Match` when it updates or deletes it. If someone else
//! changed the resource in between, the server answers `412 Precondition Failed`
//! and the client:
//!
//! 1. **Refetches** the resource with a GET to the same URL
//! 2. **Rebinds** the request to the fresh version tag (`_etag` body field, or `ETag`)
//! 3. **Backs off** exponentially
//! 4. **Retries** the mutation, up to a bounded number of times
//!
//! The caller only sees the final outcome: the decoded success body, or the last
//! 412 once the retry budget is spent.
//!
//! ## Status Handling
//!
//! | Outcome | Behaviour |
//! |---------|-----------|
//! | `2xx` | Resolve with the decoded body |
//! | `412` with an etag supplied | Refetch, back off, retry |
//! | `412` without an etag | Reject immediately |
//! | Any other `4xx` / `5xx` | Reject immediately, one request only |
//! | No response | Reject immediately |
//!
//! ## Client Usage
//!
//! ```ignore
//! use trial_portal_client::{ApiClient, ClientConfig, DeleteOptions, UpdateOptions};
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::with_config(
//!         ClientConfig::default().with_base_url("https://api.example.org"),
//!     )?;
//!
//!     let user: Value = client.fetch("/users/42", &token).await?;
//!     let etag = user["_etag"].as_str().unwrap_or_default().to_string();
//!
//!     let user: Value = client
//!         .update("/users/42", &token, UpdateOptions::new(json!({ "approved": true })).with_etag(etag))
//!         .await?;
//!
//!     client
//!         .delete("/permissions/7", &token, DeleteOptions::new().with_etag("a1b2"))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Request descriptor, payloads and responses
//! - **[error]** - Error types and result handling
//! - **[client]** - The API client, retry policy and transport
//! - **[protocol]** - Header constants and formatting

pub mod client;
pub mod error;
pub mod protocol;
pub mod types;

pub use client::{
    ApiClient, ClientConfig, ConflictPolicy, CreateOptions, DeleteOptions, FetchOptions,
    ReqwestTransport, Transport, UpdateOptions,
};
pub use error::{ApiError, Result};
pub use types::{ApiRequest, ApiResponse, FormPart, FormPayload, Payload, ResponseBody, ResponseType};

#[cfg(test)]
mod tests;
