//! Ephemeral HTTP transport tests, driving the router in-process.

#![cfg(feature = "http")]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Map, Value};
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tower::ServiceExt;

use mcp_demo::{handler_fn, CapabilityRegistry, HandlerError};
use mcp_demo_server::capabilities::register_demo_capabilities;
use mcp_demo_server::transport::http::info_router;
use mcp_demo_server::transport::HttpTransport;
use mcp_demo_server::types::{Implementation, ServerDescriptor, SERVER_NAME};

// ─────────────────────── helpers ───────────────────────

/// Requests that must be in flight together before `gather` answers any.
const OVERLAPPING: usize = 16;

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn transport(dropped: Arc<AtomicBool>) -> HttpTransport {
    let mut registry = CapabilityRegistry::new();
    register_demo_capabilities(&mut registry, "http://127.0.0.1:3002", &Implementation::default())
        .unwrap();
    registry
        .register_tool(
            "echo",
            "Returns its arguments",
            None,
            handler_fn(|args: Map<String, Value>| async move {
                Ok::<_, HandlerError>(json!({ "echo": args }))
            }),
        )
        .unwrap();
    let barrier = Arc::new(Barrier::new(OVERLAPPING));
    registry
        .register_tool(
            "gather",
            "Returns its arguments once every overlapping request has arrived",
            None,
            handler_fn(move |args: Map<String, Value>| {
                let barrier = barrier.clone();
                async move {
                    barrier.wait().await;
                    Ok::<_, HandlerError>(json!({ "echo": args }))
                }
            }),
        )
        .unwrap();
    registry
        .register_tool(
            "hang",
            "Never finishes",
            None,
            handler_fn(move |_args: Map<String, Value>| {
                let dropped = dropped.clone();
                async move {
                    let _flag = DropFlag(dropped);
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok::<_, HandlerError>(Value::Null)
                }
            }),
        )
        .unwrap();
    HttpTransport::new(Arc::new(registry), Implementation::default())
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn rpc(id: i64, method: &str, params: Value) -> Request<Body> {
    post(
        json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }).to_string(),
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

// ─────────────────────── /mcp ───────────────────────

#[tokio::test]
async fn request_gets_one_json_response() {
    let t = transport(Arc::default());
    let app = t.router();

    let (status, body) = send(
        &app,
        rpc(1, "tools/call", json!({"name": "mcpDemo_getTime", "arguments": {"format": "iso"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert!(body["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .ends_with('Z'));
    assert_eq!(t.live_sessions(), 0);
}

#[tokio::test]
async fn concurrent_requests_do_not_cross() {
    let t = transport(Arc::default());
    let app = t.router();

    // `gather` only answers once all requests are parked inside their
    // handlers, so every session is live at the same time.
    let mut requests = JoinSet::new();
    for id in 0..OVERLAPPING as i64 {
        let app = app.clone();
        requests.spawn(async move {
            let (status, body) = send(
                &app,
                rpc(id, "tools/call", json!({"name": "gather", "arguments": {"n": id}})),
            )
            .await;
            (id, status, body)
        });
    }

    let mut answered = 0;
    while let Some(joined) = tokio::time::timeout(Duration::from_secs(5), requests.join_next())
        .await
        .expect("requests overlapped")
    {
        let (id, status, body) = joined.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id);
        assert_eq!(body["result"]["echo"]["n"], id);
        answered += 1;
    }
    assert_eq!(answered, OVERLAPPING);
    assert_eq!(t.live_sessions(), 0);
}

#[tokio::test]
async fn numeric_ids_outside_i64_get_a_response() {
    let app = transport(Arc::default()).router();
    for id in [json!(1.5), json!(18446744073709551615u64)] {
        let body = json!({
            "jsonrpc": "2.0",
            "id": id.clone(),
            "method": "tools/call",
            "params": { "name": "echo", "arguments": { "n": 1 } }
        });
        let (status, response) = send(&app, post(body.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["id"], id);
        assert_eq!(response["result"]["echo"]["n"], 1);
    }
}

#[tokio::test]
async fn errors_are_enveloped_with_200() {
    let app = transport(Arc::default()).router();
    let (status, body) = send(&app, rpc(2, "tools/call", json!({"name": "nope"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32803);
}

#[tokio::test]
async fn notification_is_accepted_without_body() {
    let t = transport(Arc::default());
    let app = t.router();
    let (status, body) = send(
        &app,
        post(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, Value::Null);
    assert_eq!(t.live_sessions(), 0);
}

#[tokio::test]
async fn malformed_json_is_internal_server_error() {
    let t = transport(Arc::default());
    let app = t.router();
    let (status, body) = send(&app, post("{not json")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal Server Error"}));
    assert_eq!(t.live_sessions(), 0);
}

#[tokio::test]
async fn non_envelope_is_bad_request() {
    let app = transport(Arc::default()).router();
    let (status, body) = send(&app, post("[1, 2, 3]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["id"], Value::Null);
    assert_eq!(body["error"]["code"], -32600);
}

#[tokio::test]
async fn disconnect_aborts_handler_and_releases_session() {
    let dropped = Arc::new(AtomicBool::new(false));
    let t = transport(dropped.clone());
    let app = t.router();

    let in_flight = tokio::spawn({
        let app = app.clone();
        async move { send(&app, rpc(3, "tools/call", json!({"name": "hang"}))).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(t.live_sessions(), 1);

    in_flight.abort();
    assert!(in_flight.await.unwrap_err().is_cancelled());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(t.live_sessions(), 0);
    assert!(dropped.load(Ordering::SeqCst));
}

// ─────────────────────── other routes ───────────────────────

#[tokio::test]
async fn server_info_json_is_served() {
    let app = transport(Arc::default()).router();
    let request = Request::builder()
        .uri("/server-info.json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], SERVER_NAME);
    assert_eq!(body["capabilities"], json!(["tools", "resources", "prompts"]));
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = transport(Arc::default()).router();

    let get_mcp = Request::builder().uri("/mcp").body(Body::empty()).unwrap();
    let (status, body) = send(&app, get_mcp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Not Found"}));

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/mcp")
        .header(header::ORIGIN, "http://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, preflight).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let other = Request::builder()
        .method(Method::POST)
        .uri("/other")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, other).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn info_router_only_serves_descriptor() {
    let app = info_router(ServerDescriptor::new(&Implementation::default()));

    let request = Request::builder()
        .uri("/server-info.json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (status, _) = send(&app, rpc(1, "ping", Value::Null)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
