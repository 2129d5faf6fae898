//! Ephemeral HTTP transport: one session per `POST /mcp`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRef, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json as AxumJson, Response},
    routing::{get, post},
    Router,
};
use mcp_demo::CapabilityRegistry;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::protocol::ProtocolHandler;
use crate::types::{
    Implementation, JsonRpcMessage, McpError, McpResult, RequestId, ServerDescriptor,
};

/// Shared state passed to all handlers via axum State.
#[derive(Clone)]
struct HttpState {
    registry: Arc<CapabilityRegistry>,
    server_info: Implementation,
    descriptor: Arc<ServerDescriptor>,
    live_sessions: Arc<AtomicUsize>,
}

impl FromRef<HttpState> for Arc<ServerDescriptor> {
    fn from_ref(state: &HttpState) -> Self {
        state.descriptor.clone()
    }
}

/// HTTP transport for web-based MCP clients.
pub struct HttpTransport {
    state: HttpState,
}

impl HttpTransport {
    pub fn new(registry: Arc<CapabilityRegistry>, server_info: Implementation) -> Self {
        let descriptor = Arc::new(ServerDescriptor::new(&server_info));
        Self {
            state: HttpState {
                registry,
                server_info,
                descriptor,
                live_sessions: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    /// Sessions currently holding a dispatcher.
    pub fn live_sessions(&self) -> usize {
        self.state.live_sessions.load(Ordering::SeqCst)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/mcp", post(handle_mcp).fallback(not_found))
            .route("/server-info.json", get(handle_server_info))
            .fallback(not_found)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(self.state.clone())
    }

    /// Bind `addr` and serve until the process exits.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!("HTTP transport listening on {addr}");
        serve(listener, self.router()).await
    }
}

/// Router exposing only the static descriptor.
pub fn info_router(descriptor: ServerDescriptor) -> Router {
    Router::new()
        .route("/server-info.json", get(handle_server_info))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(descriptor))
}

pub async fn serve(listener: tokio::net::TcpListener, router: Router) -> McpResult<()> {
    axum::serve(listener, router)
        .await
        .map_err(|e| McpError::Transport(e.to_string()))
}

/// Live-session guard. Released on every exit path, including a dropped
/// request future.
struct HttpSession {
    id: Uuid,
    live: Arc<AtomicUsize>,
}

impl HttpSession {
    fn open(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            id: Uuid::new_v4(),
            live,
        }
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!(session = %self.id, "HTTP session released");
    }
}

async fn handle_mcp(State(state): State<HttpState>, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Rejecting malformed body: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                AxumJson(json!({ "error": "Internal Server Error" })),
            )
                .into_response();
        }
    };

    let msg: JsonRpcMessage = match serde_json::from_value(value) {
        Ok(msg) => msg,
        Err(e) => {
            let error = McpError::InvalidRequest(e.to_string());
            return (
                StatusCode::BAD_REQUEST,
                AxumJson(error.to_json_rpc_error(RequestId::Null)),
            )
                .into_response();
        }
    };

    let session = HttpSession::open(state.live_sessions.clone());
    let span = tracing::info_span!("mcp_session", session = %session.id);
    let handler = ProtocolHandler::new(state.registry.clone(), state.server_info.clone());

    let response = handler.handle_message(msg).instrument(span).await;
    drop(session);

    match response {
        Some(envelope) => AxumJson(envelope).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn handle_server_info(State(descriptor): State<Arc<ServerDescriptor>>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        descriptor.to_pretty_json(),
    )
        .into_response()
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        AxumJson(json!({ "error": "Not Found" })),
    )
        .into_response()
}
