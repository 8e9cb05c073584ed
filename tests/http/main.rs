//! HTTP transport integration tests.
//!
//! Starts an axum server on a free port and drives it through the store's
//! default transport.

#![cfg(feature = "http")]

use std::collections::BTreeMap;
use std::time::Duration;

use actionstore::{
    ActionError, ApiDefinition, CallOptions, CommitMode, CommitTemplate, HttpTransport, Method,
    ModelDefinition, Request, Store, StoreConfig, Transport, TransportError,
};
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::{json, Value};

async fn users() -> Json<Value> {
    Json(json!([{ "id": 1, "name": "Ada" }, { "id": 2, "name": "Grace" }]))
}

async fn echo(
    method: axum::http::Method,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "token": header("x-token"),
        "trace": header("x-trace"),
        "body": body,
    }))
}

async fn missing() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "nope" })))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!("too late"))
}

async fn text() -> &'static str {
    "plain words"
}

/// Bind to port 0 and return the actual address.
async fn start_server() -> String {
    let app = Router::new()
        .route("/users", get(users))
        .route("/echo", any(echo))
        .route("/missing", get(missing))
        .route("/slow", get(slow))
        .route("/text", get(text));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn store(base: &str) -> Store {
    Store::builder("remote")
        .config(
            StoreConfig::new()
                .endpoint(base)
                .header("x-token", "secret"),
        )
        .model(ModelDefinition::many("users"))
        .action(
            "fetch_users",
            ApiDefinition::get("/users").commit(CommitTemplate::new("users", CommitMode::Set)),
        )
        .action(
            "echo",
            ApiDefinition::post("/echo")
                .query(json!({ "source": "definition" }))
                .body(json!({ "kind": "note", "draft": true })),
        )
        .action("missing", ApiDefinition::get("/missing"))
        .action("slow", ApiDefinition::get("/slow"))
        .action("text", ApiDefinition::get("/text"))
        .build()
        .unwrap()
}

#[tokio::test]
async fn fetched_json_is_committed() {
    let base = start_server().await;
    let store = store(&base);

    let data = store
        .action("fetch_users")
        .unwrap()
        .execute(CallOptions::new())
        .await
        .unwrap();

    assert_eq!(data.as_array().map(Vec::len), Some(2));
    assert_eq!(*store.model("users").unwrap().get().unwrap(), data);
}

#[tokio::test]
async fn request_parts_reach_the_server() {
    let base = start_server().await;
    let store = store(&base);

    let data = store
        .action("echo")
        .unwrap()
        .execute(
            CallOptions::new()
                .query(json!({ "page": 2 }))
                .headers(json!({ "x-trace": "abc" }))
                .body(json!({ "draft": false, "title": "Hi" })),
        )
        .await
        .unwrap();

    assert_eq!(data["method"], "POST");
    assert_eq!(data["query"], json!({ "source": "definition", "page": "2" }));
    assert_eq!(data["token"], "secret");
    assert_eq!(data["trace"], "abc");
    assert_eq!(
        data["body"],
        json!({ "kind": "note", "draft": false, "title": "Hi" })
    );
}

#[tokio::test]
async fn error_statuses_keep_their_details() {
    let base = start_server().await;
    let store = store(&base);
    let missing = store.action("missing").unwrap();

    let err = missing.execute(CallOptions::new()).await.unwrap_err();

    let api = match err {
        ActionError::Api(api) => api,
        other => panic!("expected an API error, got {other:?}"),
    };
    assert_eq!(api.status, Some(404));
    assert_eq!(api.status_text.as_deref(), Some("Not Found"));
    assert_eq!(api.data, Some(json!({ "error": "nope" })));
    assert!(!api.aborted);
}

#[tokio::test]
async fn abort_interrupts_the_request() {
    let base = start_server().await;
    let store = store(&base);
    let slow = store.action("slow").unwrap();

    let running = tokio::spawn({
        let slow = slow.clone();
        async move { slow.execute(CallOptions::new()).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    slow.abort();

    let err = tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, ActionError::Api(ref api) if api.aborted));
}

#[tokio::test]
async fn call_timeouts_apply() {
    let base = start_server().await;
    let store = store(&base);

    let err = store
        .action("slow")
        .unwrap()
        .execute(CallOptions::new().timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), TransportError::TimedOut.to_string());
}

#[tokio::test]
async fn non_json_bodies_come_back_as_text() {
    let base = start_server().await;
    let store = store(&base);

    let data = store
        .action("text")
        .unwrap()
        .execute(CallOptions::new())
        .await
        .unwrap();

    assert_eq!(data, json!("plain words"));
}

#[tokio::test]
async fn transport_reports_status_and_headers() {
    let base = start_server().await;
    let transport = HttpTransport::new();

    let response = transport
        .fetch(Request::new(Method::Get, format!("{base}/users")))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.status_text, "OK");
    assert_eq!(
        response.headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
}

#[tokio::test]
async fn unreachable_hosts_are_network_errors() {
    // Bind and drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = HttpTransport::new()
        .fetch(Request::new(Method::Get, format!("http://{addr}/users")))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Network(_)));
}
