//! Persistent stream transport tests over in-memory duplex pipes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::task::JoinHandle;

use mcp_demo::{handler_fn, CapabilityRegistry, HandlerError};
use mcp_demo_server::protocol::ProtocolHandler;
use mcp_demo_server::transport::StdioTransport;
use mcp_demo_server::types::{Implementation, McpError, McpResult};

// ─────────────────────── helpers ───────────────────────

/// Sets `dropped` when the handler future is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
struct SlowHandler {
    dropped: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

fn registry(slow: &SlowHandler) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry
        .register_tool(
            "fast",
            "Answers immediately",
            None,
            handler_fn(|_args: Map<String, Value>| async {
                Ok::<_, HandlerError>(json!({ "speed": "fast" }))
            }),
        )
        .unwrap();

    let slow = slow.clone();
    registry
        .register_tool(
            "slow",
            "Sleeps for `ms` milliseconds",
            None,
            handler_fn(move |args: Map<String, Value>| {
                let slow = slow.clone();
                async move {
                    let _flag = DropFlag(slow.dropped.clone());
                    let ms = args.get("ms").and_then(Value::as_u64).unwrap_or(200);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    slow.finished.store(true, Ordering::SeqCst);
                    Ok::<_, HandlerError>(json!({ "speed": "slow" }))
                }
            }),
        )
        .unwrap();
    registry
}

struct Session {
    input: DuplexStream,
    output: Lines<BufReader<DuplexStream>>,
    serve: JoinHandle<McpResult<()>>,
}

fn start(slow: &SlowHandler) -> Session {
    let (input, server_in) = duplex(64 * 1024);
    let (server_out, output) = duplex(64 * 1024);
    let handler = ProtocolHandler::new(Arc::new(registry(slow)), Implementation::default());
    let transport = StdioTransport::new(handler);
    let serve = tokio::spawn(async move { transport.serve(server_in, server_out).await });

    Session {
        input,
        output: BufReader::new(output).lines(),
        serve,
    }
}

fn call(id: i64, name: &str, arguments: Value) -> String {
    let mut line = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
    .to_string();
    line.push('\n');
    line
}

async fn next_response(output: &mut Lines<BufReader<DuplexStream>>) -> Value {
    let line = tokio::time::timeout(Duration::from_secs(5), output.next_line())
        .await
        .expect("response in time")
        .unwrap()
        .expect("a response line");
    serde_json::from_str(&line).unwrap()
}

// ─────────────────────── tests ───────────────────────

#[tokio::test]
async fn fast_request_overtakes_slow_one() {
    let slow = SlowHandler::default();
    let mut s = start(&slow);

    s.input
        .write_all(call(1, "slow", json!({"ms": 300})).as_bytes())
        .await
        .unwrap();
    s.input
        .write_all(call(2, "fast", json!({})).as_bytes())
        .await
        .unwrap();

    let first = next_response(&mut s.output).await;
    let second = next_response(&mut s.output).await;
    assert_eq!(first["id"], 2);
    assert_eq!(first["result"]["speed"], "fast");
    assert_eq!(second["id"], 1);
    assert_eq!(second["result"]["speed"], "slow");

    drop(s.input);
    s.serve.await.unwrap().unwrap();
}

#[tokio::test]
async fn parse_errors_use_null_id_and_blank_lines_are_skipped() {
    let slow = SlowHandler::default();
    let mut s = start(&slow);

    s.input.write_all(b"\n   \n{not json\n").await.unwrap();
    s.input
        .write_all(call(5, "fast", json!({})).as_bytes())
        .await
        .unwrap();

    let error = next_response(&mut s.output).await;
    assert_eq!(error["id"], Value::Null);
    assert_eq!(error["error"]["code"], -32700);

    let ok = next_response(&mut s.output).await;
    assert_eq!(ok["id"], 5);

    drop(s.input);
    s.serve.await.unwrap().unwrap();
}

#[tokio::test]
async fn notifications_are_not_answered() {
    let slow = SlowHandler::default();
    let mut s = start(&slow);

    s.input
        .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
        .await
        .unwrap();
    s.input
        .write_all(call(6, "fast", json!({})).as_bytes())
        .await
        .unwrap();

    let only = next_response(&mut s.output).await;
    assert_eq!(only["id"], 6);

    drop(s.input);
    s.serve.await.unwrap().unwrap();
    assert!(s.output.next_line().await.unwrap().is_none());
}

#[tokio::test]
async fn eof_drains_in_flight_requests() {
    let slow = SlowHandler::default();
    let mut s = start(&slow);

    s.input
        .write_all(call(7, "slow", json!({"ms": 100})).as_bytes())
        .await
        .unwrap();
    drop(s.input);

    let response = next_response(&mut s.output).await;
    assert_eq!(response["id"], 7);
    assert_eq!(response["result"]["speed"], "slow");
    s.serve.await.unwrap().unwrap();
    assert!(slow.finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn writer_failure_aborts_in_flight_handlers() {
    let slow = SlowHandler::default();
    let mut s = start(&slow);

    s.input
        .write_all(call(8, "slow", json!({"ms": 10_000})).as_bytes())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(s.output);

    s.input
        .write_all(call(9, "fast", json!({})).as_bytes())
        .await
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), s.serve)
        .await
        .expect("session torn down")
        .unwrap();
    assert!(matches!(result, Err(McpError::Transport(_))));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(slow.dropped.load(Ordering::SeqCst));
    assert!(!slow.finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancelled_request_is_never_answered() {
    let slow = SlowHandler::default();
    let mut s = start(&slow);

    s.input
        .write_all(call(10, "slow", json!({"ms": 10_000})).as_bytes())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let cancel = json!({
        "jsonrpc": "2.0",
        "method": "notifications/cancelled",
        "params": { "requestId": 10, "reason": "user aborted" }
    });
    s.input
        .write_all(format!("{cancel}\n").as_bytes())
        .await
        .unwrap();
    s.input
        .write_all(call(11, "fast", json!({})).as_bytes())
        .await
        .unwrap();

    let only = next_response(&mut s.output).await;
    assert_eq!(only["id"], 11);

    drop(s.input);
    tokio::time::timeout(Duration::from_secs(5), s.serve)
        .await
        .expect("session closed without waiting on the cancelled request")
        .unwrap()
        .unwrap();
    assert!(s.output.next_line().await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(slow.dropped.load(Ordering::SeqCst));
    assert!(!slow.finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn string_request_ids_can_be_cancelled() {
    let slow = SlowHandler::default();
    let mut s = start(&slow);

    let slow_request = json!({
        "jsonrpc": "2.0",
        "id": "job-1",
        "method": "tools/call",
        "params": { "name": "slow", "arguments": { "ms": 10_000 } }
    });
    s.input
        .write_all(format!("{slow_request}\n").as_bytes())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    s.input
        .write_all(
            b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/cancelled\",\"params\":{\"requestId\":\"job-1\"}}\n",
        )
        .await
        .unwrap();

    drop(s.input);
    tokio::time::timeout(Duration::from_secs(5), s.serve)
        .await
        .expect("session closed")
        .unwrap()
        .unwrap();
    assert!(s.output.next_line().await.unwrap().is_none());
    assert!(!slow.finished.load(Ordering::SeqCst));
}
