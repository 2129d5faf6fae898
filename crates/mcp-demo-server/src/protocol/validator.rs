//! JSON-RPC envelope validation.

use crate::types::{JsonRpcNotification, JsonRpcRequest, McpError, McpResult, JSONRPC_VERSION};

/// Validate that a JSON-RPC request is well-formed.
pub fn validate_request(request: &JsonRpcRequest) -> McpResult<()> {
    validate_envelope(&request.jsonrpc, &request.method)
}

pub fn validate_notification(notification: &JsonRpcNotification) -> McpResult<()> {
    validate_envelope(&notification.jsonrpc, &notification.method)
}

fn validate_envelope(jsonrpc: &str, method: &str) -> McpResult<()> {
    if jsonrpc != JSONRPC_VERSION {
        return Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{jsonrpc}\""
        )));
    }

    if method.is_empty() {
        return Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        ));
    }

    Ok(())
}
