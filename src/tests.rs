//! Client behaviour against an in-memory transport.
//!
//! Time is paused, so backoff sleeps complete instantly while `Instant`
//! still advances by the slept amount.

use crate::client::{ApiClient, ClientConfig, ConflictPolicy, Transport};
use crate::error::{ApiError, Result};
use crate::types::{ApiRequest, ApiResponse, FormPayload, Payload, ResponseBody, ResponseType};
use crate::{CreateOptions, DeleteOptions, FetchOptions, UpdateOptions};
use async_trait::async_trait;
use http::Method;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync;

struct ScriptedTransport {
    requests: Mutex<Vec<ApiRequest>>,
    handler: Box<Handler>,
}

impl ScriptedTransport {
    fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync + 'static,
    {
        Arc::new(ScriptedTransport {
            requests: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        })
    }

    fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    fn methods(&self) -> Vec<Method> {
        self.requests().into_iter().map(|r| r.method).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().push(request.clone());
        (self.handler)(request)
    }
}

const URL: &str = "http://portal.test/trial_metadata/10021";

fn client(transport: Arc<ScriptedTransport>) -> ApiClient {
    ApiClient::with_transport(transport, ClientConfig::default()).unwrap()
}

fn conflict() -> Result<ApiResponse> {
    Err(ApiError::status_error(412, "etag mismatch"))
}

fn json_response(body: Value) -> Result<ApiResponse> {
    Ok(ApiResponse::new(200, body.to_string()).with_header("content-type", "application/json"))
}

/// Server whose current version is `current`; PATCH/DELETE succeed only with it.
fn versioned_server(current: &'static str) -> Arc<ScriptedTransport> {
    ScriptedTransport::new(move |req| match req.method {
        Method::GET => json_response(json!({ "trial_id": "10021", "_etag": current })),
        _ if req.if_match.as_deref() == Some(current) => {
            if req.method == Method::DELETE {
                Ok(ApiResponse::new(204, ""))
            } else {
                json_response(json!({ "trial_id": "10021", "_etag": "after", "updated": true }))
            }
        }
        _ => conflict(),
    })
}

#[tokio::test(start_paused = true)]
async fn test_update_resolves_after_one_conflict() {
    let transport = versioned_server("new");
    let client = client(transport.clone());

    let data = json!({ "metadata_json": { "allowed_cohort_names": ["A"] } });
    let updated: Value = client
        .update(URL, "tok", UpdateOptions::new(data.clone()).with_etag("old"))
        .await
        .unwrap();

    assert_eq!(updated["updated"], true);
    assert_eq!(transport.methods(), vec![Method::PATCH, Method::GET, Method::PATCH]);

    let requests = transport.requests();
    assert_eq!(requests[0].if_match.as_deref(), Some("old"));
    assert_eq!(requests[1].url, URL);
    assert_eq!(requests[1].bearer_token, "tok");
    assert!(requests[1].if_match.is_none());
    assert_eq!(requests[2].if_match.as_deref(), Some("new"));
    assert_eq!(requests[2].payload, Some(Payload::Json(data)));
}

#[tokio::test(start_paused = true)]
async fn test_delete_resolves_after_one_conflict() {
    let transport = versioned_server("new");
    let client = client(transport.clone());

    let response = client
        .delete(URL, "tok", DeleteOptions::new().with_etag("old"))
        .await
        .unwrap();

    assert_eq!(response.status, 204);
    assert_eq!(
        transport.methods(),
        vec![Method::DELETE, Method::GET, Method::DELETE]
    );
    assert_eq!(transport.requests()[2].if_match.as_deref(), Some("new"));
}

#[tokio::test(start_paused = true)]
async fn test_refetch_version_from_etag_header() {
    let transport = ScriptedTransport::new(|req| match req.method {
        Method::GET => Ok(ApiResponse::new(200, "{}").with_header("ETag", "\"h1\"")),
        _ if req.if_match.as_deref() == Some("\"h1\"") => Ok(ApiResponse::new(204, "")),
        _ => conflict(),
    });
    let client = client(transport.clone());

    client
        .delete(URL, "tok", DeleteOptions::new().with_etag("\"h0\""))
        .await
        .unwrap();
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_max_retries() {
    let transport = ScriptedTransport::new(|req| match req.method {
        Method::GET => json_response(json!({ "_etag": "still-stale" })),
        _ => conflict(),
    });
    let client = client(transport.clone());

    let err = client
        .update::<Value>(URL, "tok", UpdateOptions::new(json!({})).with_etag("v0"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(412));
    assert_eq!(err.data(), Some("etag mismatch"));
    // initial attempt plus five GET + PATCH cycles
    assert_eq!(transport.requests().len(), 11);
    assert_eq!(
        transport.methods().iter().filter(|m| **m == Method::GET).count(),
        5
    );
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_between_retries() {
    let transport = ScriptedTransport::new(|req| match req.method {
        Method::GET => json_response(json!({ "_etag": "x" })),
        _ => conflict(),
    });
    let client = client(transport);

    let started = tokio::time::Instant::now();
    let _ = client
        .delete(URL, "tok", DeleteOptions::new().with_etag("v0"))
        .await;

    // 100 + 200 + 400 + 800 + 1600 ms
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(3100), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(3200), "{:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_elapsed_budget_limits_retries() {
    let transport = ScriptedTransport::new(|req| match req.method {
        Method::GET => json_response(json!({ "_etag": "x" })),
        _ => conflict(),
    });
    let config = ClientConfig::default().with_conflict_policy(
        ConflictPolicy::default()
            .with_max_retries(100)
            .with_max_elapsed(Some(Duration::from_secs(1))),
    );
    let client = ApiClient::with_transport(transport.clone(), config).unwrap();

    let err = client
        .delete(URL, "tok", DeleteOptions::new().with_etag("v0"))
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    // retries after 100, 200 and 400 ms; the 800 ms one would overrun the budget
    assert_eq!(transport.requests().len(), 7);
}

/// Delegates to `inner`, but the first send takes `first_latency`.
struct SlowFirstTransport {
    inner: Arc<ScriptedTransport>,
    first_latency: Duration,
    sent: Mutex<u32>,
}

#[async_trait]
impl Transport for SlowFirstTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let first = {
            let mut sent = self.sent.lock();
            *sent += 1;
            *sent == 1
        };
        if first {
            tokio::time::sleep(self.first_latency).await;
        }
        self.inner.send(request).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_first_send_still_gets_one_retry() {
    let inner = versioned_server("new");
    let transport = Arc::new(SlowFirstTransport {
        inner: inner.clone(),
        first_latency: Duration::from_secs(11),
        sent: Mutex::new(0),
    });
    let client = ApiClient::with_transport(transport, ClientConfig::default()).unwrap();

    let updated: Value = client
        .update(URL, "tok", UpdateOptions::new(json!({})).with_etag("old"))
        .await
        .unwrap();

    assert_eq!(updated["updated"], true);
    assert_eq!(inner.methods(), vec![Method::PATCH, Method::GET, Method::PATCH]);
}

#[tokio::test(start_paused = true)]
async fn test_form_update_resends_same_form_after_conflict() {
    let transport = versioned_server("new");
    let client = client(transport.clone());

    let form = FormPayload::new()
        .text("trial_id", "10021")
        .file("manifest", "pbmc.csv", Some("text/csv"), "sample_id\nS1\n");
    let _: Value = client
        .update(URL, "tok", UpdateOptions::new(form.clone()).with_etag("old"))
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(transport.methods(), vec![Method::PATCH, Method::GET, Method::PATCH]);
    assert_eq!(requests[0].payload, Some(Payload::Form(form.clone())));
    assert!(requests[1].payload.is_none());
    assert_eq!(requests[2].if_match.as_deref(), Some("new"));
    assert_eq!(requests[2].payload, Some(Payload::Form(form)));
}

#[tokio::test(start_paused = true)]
async fn test_conflict_without_etag_is_not_retried() {
    let transport = ScriptedTransport::new(|_| conflict());
    let client = client(transport.clone());

    let err = client
        .update::<Value>(URL, "tok", UpdateOptions::new(json!({ "a": 1 })))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(412));
    assert_eq!(transport.methods(), vec![Method::PATCH]);
    assert!(transport.requests()[0].if_match.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_delete_without_etag_is_not_retried() {
    let transport = ScriptedTransport::new(|_| conflict());
    let client = client(transport.clone());

    let err = client.delete(URL, "tok", DeleteOptions::new()).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_non_conflict_errors_are_not_retried() {
    for status in [400u16, 401, 403, 404, 409, 500, 503] {
        let transport = ScriptedTransport::new(move |_| Err(ApiError::status_error(status, "nope")));
        let client = client(transport.clone());

        let err = client
            .update::<Value>(URL, "tok", UpdateOptions::new(json!({})).with_etag("v1"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(status));
        assert_eq!(transport.requests().len(), 1, "status {}", status);
    }
}

#[tokio::test(start_paused = true)]
async fn test_network_error_is_not_retried() {
    let transport = ScriptedTransport::new(|_| Err(ApiError::Network("connection reset".into())));
    let client = client(transport.clone());

    let err = client
        .delete(URL, "tok", DeleteOptions::new().with_etag("v1"))
        .await
        .unwrap_err();

    assert!(err.is_network());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refetch_failure_propagates() {
    let transport = ScriptedTransport::new(|req| match req.method {
        Method::GET => Err(ApiError::status_error(404, "resource deleted")),
        _ => conflict(),
    });
    let client = client(transport.clone());

    let err = client
        .update::<Value>(URL, "tok", UpdateOptions::new(json!({})).with_etag("v1"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(transport.methods(), vec![Method::PATCH, Method::GET]);
}

#[tokio::test(start_paused = true)]
async fn test_refetch_without_version_surfaces_conflict() {
    let transport = ScriptedTransport::new(|req| match req.method {
        Method::GET => json_response(json!({ "trial_id": "10021" })),
        _ => conflict(),
    });
    let client = client(transport.clone());

    let err = client
        .update::<Value>(URL, "tok", UpdateOptions::new(json!({})).with_etag("v1"))
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(transport.methods(), vec![Method::PATCH, Method::GET]);
}

#[tokio::test(start_paused = true)]
async fn test_no_retry_policy() {
    let transport = versioned_server("new");
    let config = ClientConfig::default().with_conflict_policy(ConflictPolicy::no_retry());
    let client = ApiClient::with_transport(transport.clone(), config).unwrap();

    let err = client
        .delete(URL, "tok", DeleteOptions::new().with_etag("old"))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_custom_etag_field() {
    let transport = ScriptedTransport::new(|req| match req.method {
        Method::GET => json_response(json!({ "version": "v9" })),
        _ if req.if_match.as_deref() == Some("v9") => json_response(json!({ "ok": true })),
        _ => conflict(),
    });
    let config = ClientConfig::default()
        .with_conflict_policy(ConflictPolicy::default().with_etag_field("version"));
    let client = ApiClient::with_transport(transport, config).unwrap();

    let body: Value = client
        .update(URL, "tok", UpdateOptions::new(json!({})).with_etag("v1"))
        .await
        .unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_updates_are_independent() {
    let transport = ScriptedTransport::new(|req| {
        let current = if req.url.ends_with("/a") { "a2" } else { "b2" };
        match req.method {
            Method::GET => json_response(json!({ "_etag": current })),
            _ if req.if_match.as_deref() == Some(current) => json_response(json!({ "url": req.url })),
            _ => conflict(),
        }
    });
    let client = client(transport.clone());

    let (a, b) = futures::join!(
        client.update::<Value>(
            "http://portal.test/a",
            "tok",
            UpdateOptions::new(json!({})).with_etag("a1")
        ),
        client.update::<Value>(
            "http://portal.test/b",
            "tok",
            UpdateOptions::new(json!({})).with_etag("b1")
        ),
    );

    assert_eq!(a.unwrap()["url"], "http://portal.test/a");
    assert_eq!(b.unwrap()["url"], "http://portal.test/b");
    assert_eq!(transport.requests().len(), 6);
}

#[tokio::test]
async fn test_fetch_is_not_cached() {
    let transport = versioned_server("v1");
    let client = client(transport.clone());

    let first: Value = client.fetch(URL, "tok").await.unwrap();
    let second: Value = client.fetch(URL, "tok").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.methods(), vec![Method::GET, Method::GET]);
}

#[tokio::test]
async fn test_fetch_error_is_untranslated() {
    let transport = ScriptedTransport::new(|_| Err(ApiError::status_error(403, "forbidden")));
    let client = client(transport.clone());

    let err = client.fetch::<Value>(URL, "tok").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 403, ref data, .. } if data == "forbidden"));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_fetch_412_is_not_retried() {
    let transport = ScriptedTransport::new(|_| conflict());
    let client = client(transport.clone());

    assert!(client.fetch::<Value>(URL, "tok").await.unwrap_err().is_conflict());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_create_sends_payload_unconditionally() {
    let transport = ScriptedTransport::new(|req| {
        assert!(req.if_match.is_none());
        json_response(json!({ "id": 7 }))
    });
    let client = client(transport.clone());

    let form = FormPayload::new()
        .text("trial_id", "10021")
        .file("template", "pbmc.xlsx", None, b"xlsx".to_vec());
    let created: Value = client
        .create(URL, "tok", CreateOptions::new(form.clone()))
        .await
        .unwrap();

    assert_eq!(created["id"], 7);
    let requests = transport.requests();
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].payload, Some(Payload::Form(form)));
}

#[tokio::test]
async fn test_create_412_is_not_retried() {
    let transport = ScriptedTransport::new(|_| conflict());
    let client = client(transport.clone());

    let err = client
        .create::<Value>(URL, "tok", CreateOptions::new(json!({})))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_fetch_decoded_and_options() {
    let transport = ScriptedTransport::new(|req| {
        assert_eq!(req.query, vec![("where".to_string(), "{\"trial_id\":\"1\"}".to_string())]);
        assert_eq!(req.headers.get("accept").map(String::as_str), Some("text/plain"));
        Ok(ApiResponse::new(200, "trial_id,assay\n1,wes\n"))
    });
    let client = client(transport);

    let body = client
        .fetch_decoded(
            URL,
            "tok",
            FetchOptions::new()
                .with_response_type(ResponseType::Text)
                .with_header("accept", "text/plain")
                .with_query("where", "{\"trial_id\":\"1\"}"),
        )
        .await
        .unwrap();

    assert_eq!(body, ResponseBody::Text("trial_id,assay\n1,wes\n".into()));
}

#[tokio::test]
async fn test_relative_url_uses_base() {
    let transport = versioned_server("v1");
    let config = ClientConfig::default().with_base_url("http://portal.test/api");
    let client = ApiClient::with_transport(transport.clone(), config).unwrap();

    let _: Value = client.fetch("/trial_metadata", "tok").await.unwrap();
    assert_eq!(transport.requests()[0].url, "http://portal.test/api/trial_metadata");
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

async fn unversioned_refetch_warnings(enable_logging: bool) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let transport = ScriptedTransport::new(|req| match req.method {
        Method::GET => json_response(json!({ "trial_id": "10021" })),
        _ => conflict(),
    });
    let config = ClientConfig::default().with_logging(enable_logging);
    let client = ApiClient::with_transport(transport, config).unwrap();
    let err = client
        .update::<Value>(URL, "tok", UpdateOptions::new(json!({})).with_etag("v1"))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    logs.contents()
}

#[tokio::test(start_paused = true)]
async fn test_conflict_warnings_follow_logging_flag() {
    let quiet = unversioned_refetch_warnings(false).await;
    assert!(quiet.is_empty(), "{}", quiet);

    let loud = unversioned_refetch_warnings(true).await;
    assert!(loud.contains("no version tag"), "{}", loud);
}
