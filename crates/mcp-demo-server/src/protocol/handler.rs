//! Main request dispatcher: receives JSON-RPC messages, routes to capabilities.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use mcp_demo::{CapabilityEntry, CapabilityKind, CapabilityRegistry};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinSet};

use crate::types::*;

use super::negotiation::NegotiatedCapabilities;
use super::route::{DispatchStage, Operation, Route};
use super::validator::{validate_notification, validate_request};

/// Dispatches incoming JSON-RPC messages for one transport session.
///
/// The registry is shared and read-only; negotiated client state and the
/// table of cancellable requests belong to this handler alone.
pub struct ProtocolHandler {
    registry: Arc<CapabilityRegistry>,
    server_info: Implementation,
    capabilities: Mutex<NegotiatedCapabilities>,
    in_flight: StdMutex<HashMap<RequestId, AbortHandle>>,
}

impl ProtocolHandler {
    pub fn new(registry: Arc<CapabilityRegistry>, server_info: Implementation) -> Self {
        Self {
            registry,
            server_info,
            capabilities: Mutex::new(NegotiatedCapabilities::default()),
            in_flight: StdMutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Spawn the task answering `id` and keep its abort handle until
    /// [`untrack`](Self::untrack), so `notifications/cancelled` can stop it.
    ///
    /// The table stays locked while `spawn` runs, so a task that finishes at
    /// once still finds its own entry to remove.
    pub fn track(&self, id: RequestId, spawn: impl FnOnce() -> AbortHandle) {
        let mut requests = self.requests();
        let task = spawn();
        if requests.insert(id.clone(), task).is_some() {
            tracing::warn!(%id, "Request id reused while still in flight");
        }
    }

    /// Forget `id` once its response is ready to send.
    pub fn untrack(&self, id: &RequestId) {
        self.requests().remove(id);
    }

    fn requests(&self) -> MutexGuard<'_, HashMap<RequestId, AbortHandle>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle one inbound message. Returns the response envelope for
    /// requests and `None` for everything else.
    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            _ => {
                tracing::warn!("Received unexpected message type from client");
                None
            }
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        let id = request.id.clone();
        tracing::debug!(%id, method = %request.method, stage = %DispatchStage::Received);

        let result = match validate_request(&request) {
            Ok(()) => self.dispatch_request(request).await,
            Err(e) => Err(e),
        };

        tracing::debug!(%id, ok = result.is_ok(), stage = %DispatchStage::Responded);
        let envelope = match result {
            Ok(value) => serde_json::to_value(JsonRpcResponse::new(id.clone(), value)),
            Err(e) => {
                tracing::debug!(%id, "Request failed: {e}");
                serde_json::to_value(e.to_json_rpc_error(id.clone()))
            }
        };
        envelope.unwrap_or_else(|e| {
            let fallback = McpError::InternalError(e.to_string()).to_json_rpc_error(id);
            serde_json::to_value(fallback).unwrap_or_default()
        })
    }

    async fn dispatch_request(&self, request: JsonRpcRequest) -> McpResult<Value> {
        let route = Route::parse(&request.method)?;
        let params = request.params;

        match route {
            Route::Initialize => self.handle_initialize(params).await,
            Route::Ping => Ok(Value::Object(Map::new())),
            Route::Capability(kind, Operation::List) => self.handle_list(kind),
            Route::Capability(CapabilityKind::Tool, Operation::Call) => {
                let call: ToolCallParams = parse_params(params, "Tool call")?;
                let entry = self.registry.resolve(CapabilityKind::Tool, &call.name)?;
                self.invoke(&request.id, entry, call.arguments).await
            }
            Route::Capability(CapabilityKind::Resource, Operation::Read) => {
                let read: ResourceReadParams = parse_params(params, "Resource read")?;
                let entry = self.registry.resolve_uri(&read.uri)?;
                let mut args = Map::new();
                args.insert("uri".to_string(), Value::String(read.uri));
                self.invoke(&request.id, entry, Some(Value::Object(args)))
                    .await
            }
            Route::Capability(CapabilityKind::Prompt, Operation::Get) => {
                let get: PromptGetParams = parse_params(params, "Prompt get")?;
                let entry = self.registry.resolve(CapabilityKind::Prompt, &get.name)?;
                self.invoke(&request.id, entry, get.arguments).await
            }
            Route::Capability(kind, op) => Err(McpError::MethodNotFound(format!(
                "{} does not support {op:?}",
                kind.plural()
            ))),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        if let Err(e) = validate_notification(&notification) {
            tracing::warn!("Dropping malformed notification: {e}");
            return;
        }

        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => {
                self.capabilities.lock().await.mark_initialized();
            }
            "notifications/cancelled" => {
                let Some(params) = notification
                    .params
                    .and_then(|p| serde_json::from_value::<CancelledParams>(p).ok())
                else {
                    tracing::warn!("Ignoring cancellation without a valid requestId");
                    return;
                };
                let reason = params.reason.as_deref().unwrap_or("no reason given");
                let task = self.requests().remove(&params.request_id);
                match task {
                    Some(task) => {
                        task.abort();
                        tracing::info!("Client cancelled request {}: {reason}", params.request_id);
                    }
                    None => tracing::debug!(
                        "Cancellation for unknown or finished request {}",
                        params.request_id
                    ),
                }
            }
            other => {
                tracing::debug!("Unknown notification: {other}");
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init: InitializeParams = parse_params(params, "Initialize")?;
        let offered = ServerCapabilities::for_registry(&self.registry);

        let mut caps = self.capabilities.lock().await;
        let result = caps.negotiate(init, &self.server_info, offered)?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    fn handle_list(&self, kind: CapabilityKind) -> McpResult<Value> {
        let entries = self.registry.entries(kind);
        let result = match kind {
            CapabilityKind::Tool => serde_json::to_value(ToolListResult {
                tools: entries.map(tool_definition).collect(),
            }),
            CapabilityKind::Resource => serde_json::to_value(ResourceListResult {
                resources: entries.map(resource_definition).collect(),
            }),
            CapabilityKind::Prompt => serde_json::to_value(PromptListResult {
                prompts: entries.map(prompt_definition).collect(),
            }),
        };
        result.map_err(|e| McpError::InternalError(e.to_string()))
    }

    /// Validate arguments against the entry's schema, then run its handler.
    async fn invoke(
        &self,
        id: &RequestId,
        entry: &CapabilityEntry,
        arguments: Option<Value>,
    ) -> McpResult<Value> {
        let args = match entry.schema() {
            Some(schema) => schema.validate(&arguments.unwrap_or(Value::Null))?,
            None => match arguments {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(map)) => map,
                Some(_) => {
                    return Err(McpError::InvalidParams(
                        "arguments must be an object".to_string(),
                    ))
                }
            },
        };
        tracing::debug!(%id, name = entry.name(), stage = %DispatchStage::Validated);

        let result = execute(entry, args).await;
        tracing::debug!(%id, name = entry.name(), stage = %DispatchStage::Executed);
        result
    }
}

/// Run a handler in its own task.
///
/// The task is owned by a local `JoinSet`, so dropping this future aborts the
/// handler. Handler errors and panics both surface as `HandlerFailed`.
async fn execute(entry: &CapabilityEntry, args: Map<String, Value>) -> McpResult<Value> {
    let handler = entry.handler();
    let mut task = JoinSet::new();
    task.spawn(async move { handler.invoke(args).await });

    match task.join_next().await {
        Some(Ok(Ok(value))) => Ok(value),
        Some(Ok(Err(e))) => Err(McpError::HandlerFailed(e.message().to_string())),
        Some(Err(e)) if e.is_panic() => {
            tracing::error!("{} '{}' panicked", entry.kind(), entry.name());
            Err(McpError::HandlerFailed("handler panicked".to_string()))
        }
        Some(Err(_)) => Err(McpError::HandlerFailed("handler cancelled".to_string())),
        None => Err(McpError::InternalError("handler task missing".to_string())),
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>, what: &str) -> McpResult<T> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?
        .ok_or_else(|| McpError::InvalidParams(format!("{what} params required")))
}

fn tool_definition(entry: &CapabilityEntry) -> ToolDefinition {
    let input_schema = entry
        .schema()
        .map(|s| s.to_json_schema())
        .unwrap_or_else(|| serde_json::json!({ "type": "object" }));
    ToolDefinition {
        name: entry.name().to_string(),
        description: Some(entry.description().to_string()),
        input_schema,
    }
}

fn resource_definition(entry: &CapabilityEntry) -> ResourceDefinition {
    let locator = entry.locator();
    ResourceDefinition {
        uri: locator
            .map(|l| l.uri.clone())
            .unwrap_or_else(|| entry.name().to_string()),
        name: entry.name().to_string(),
        description: Some(entry.description().to_string()),
        mime_type: locator.and_then(|l| l.mime_type.clone()),
    }
}

fn prompt_definition(entry: &CapabilityEntry) -> PromptDefinition {
    let arguments = entry
        .schema()
        .map(|schema| {
            schema
                .fields()
                .iter()
                .map(|field| PromptArgument {
                    name: field.name.clone(),
                    description: field.description.clone(),
                    required: field.required,
                })
                .collect()
        })
        .unwrap_or_default();
    PromptDefinition {
        name: entry.name().to_string(),
        description: Some(entry.description().to_string()),
        arguments,
    }
}
