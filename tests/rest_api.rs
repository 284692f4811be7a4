//! HTTP surface: status codes and bodies for each endpoint.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use database_k8s_api::rest_api::{create_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{coordinator, coordinator_with_timeout, FakeStore};

fn router(store: Arc<FakeStore>) -> Router {
    create_router(Arc::new(AppState::new(Arc::new(coordinator(store)))))
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn orders_db() -> Value {
    json!({
        "name": "orders-db",
        "namespace": "default",
        "spec": {"engine": "postgres", "size": "10Gi"}
    })
}

#[tokio::test]
async fn create_returns_created_resource() {
    let app = router(FakeStore::new());

    let (status, body) = send(&app, post_json("/api/databases/create", orders_db())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "orders-db");
    assert_eq!(body["namespace"], "default");
    assert_eq!(body["spec"]["engine"], "postgres");
    assert_eq!(body["resourceVersion"], "1");
    assert_eq!(body["status"]["phase"], "Pending");
}

#[tokio::test]
async fn duplicate_create_is_conflict() {
    let app = router(FakeStore::new());

    send(&app, post_json("/api/databases/create", orders_db())).await;
    let (status, body) = send(&app, post_json("/api/databases/create", orders_db())).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "Conflict");
    assert_eq!(body["operation"], "create");
    assert_eq!(body["name"], "orders-db");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn list_returns_summaries() {
    let app = router(FakeStore::new());
    send(&app, post_json("/api/databases/create", orders_db())).await;

    let (status, body) = send(&app, get("/api/databases?namespace=default")).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "orders-db");
    assert_eq!(items[0]["engine"], "postgres");
    assert_eq!(items[0]["phase"], "Pending");

    let (status, body) = send(&app, get("/api/databases?namespace=empty")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let app = router(FakeStore::new());

    let (status, body) = send(&app, get("/api/databases/get?namespace=default&name=ghost-db")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn delete_is_accepted_then_not_found() {
    let app = router(FakeStore::new());
    send(&app, post_json("/api/databases/create", orders_db())).await;

    let (status, body) = send(&app, delete("/api/databases/delete?namespace=default&name=orders-db")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], true);
    assert_eq!(body["name"], "orders-db");
    assert_eq!(body["pendingFinalization"], false);
    assert!(body.get("phase").is_none());

    let (status, body) = send(&app, delete("/api/databases/delete?namespace=default&name=orders-db")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
}

#[tokio::test]
async fn delete_via_post_reports_finalization() {
    let store = FakeStore::new();
    store.keep_finalizing();
    let app = router(store);
    send(&app, post_json("/api/databases/create", orders_db())).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/databases/delete?name=orders-db")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["namespace"], "default");
    assert_eq!(body["pendingFinalization"], true);
    assert_eq!(body["phase"], "Deleting");
}

#[tokio::test]
async fn missing_spec_is_bad_request() {
    let store = FakeStore::new();
    let app = router(store.clone());

    let (status, body) = send(
        &app,
        post_json("/api/databases/create", json!({"name": "orders-db"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "Validation");
    assert_eq!(body["error"], "spec is required");
    assert_eq!(store.calls.total(), 0);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let store = FakeStore::new();
    let app = router(store.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/databases/create")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": \"orders-db\", \"spec\": "))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "Validation");
    assert_eq!(body["operation"], "create");
    assert_eq!(store.calls.total(), 0);
}

#[tokio::test]
async fn delete_without_name_is_bad_request() {
    let store = FakeStore::new();
    let app = router(store.clone());

    let (status, body) = send(&app, delete("/api/databases/delete?namespace=default")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "name is required");
    assert_eq!(store.calls.total(), 0);
}

#[tokio::test]
async fn slow_store_is_gateway_timeout() {
    let store = FakeStore::new();
    store.set_delay(Duration::from_millis(500));
    let app = create_router(Arc::new(AppState::new(Arc::new(coordinator_with_timeout(
        store,
        Duration::from_millis(50),
    )))));

    let (status, body) = send(&app, get("/api/databases")).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["kind"], "Timeout");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn store_outage_is_service_unavailable() {
    let store = FakeStore::new();
    store.fail_with(503, "ServiceUnavailable");
    let app = router(store);

    let (status, body) = send(&app, get("/api/databases?namespace=default")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "StoreUnavailable");

    let (status, _) = send(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[cfg(feature = "metrics")]
#[tokio::test]
async fn metrics_endpoint_exports_request_counters() {
    let app = router(FakeStore::new());
    send(&app, get("/api/databases?namespace=default")).await;

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("database_api_requests_total"));
}
