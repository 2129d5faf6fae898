//! Error types and JSON-RPC error codes for the MCP server.

use mcp_demo::{CapabilityError, CapabilityKind, ValidationError};
use serde_json::Value;

use super::message::{JsonRpcError, JsonRpcErrorObject, RequestId, JSONRPC_VERSION};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP-specific error codes.
pub mod mcp_error_codes {
    pub const RESOURCE_NOT_FOUND: i32 = -32802;
    pub const TOOL_NOT_FOUND: i32 = -32803;
    pub const PROMPT_NOT_FOUND: i32 = -32804;
    /// A capability body returned an error or panicked.
    pub const HANDLER_ERROR: i32 = -32805;
}

/// All errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Validation error: {0}")]
    Validation(ValidationError),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("{} not found: {name}", kind_label(.kind))]
    CapabilityNotFound { kind: CapabilityKind, name: String },

    #[error("Handler error: {0}")]
    HandlerFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn kind_label(kind: &CapabilityKind) -> &'static str {
    match kind {
        CapabilityKind::Tool => "Tool",
        CapabilityKind::Resource => "Resource",
        CapabilityKind::Prompt => "Prompt",
    }
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) | McpError::Validation(_) => INVALID_PARAMS,
            McpError::InternalError(_) => INTERNAL_ERROR,
            McpError::CapabilityNotFound { kind, .. } => match kind {
                CapabilityKind::Tool => TOOL_NOT_FOUND,
                CapabilityKind::Resource => RESOURCE_NOT_FOUND,
                CapabilityKind::Prompt => PROMPT_NOT_FOUND,
            },
            McpError::HandlerFailed(_) => HANDLER_ERROR,
            McpError::Transport(_) | McpError::Io(_) => INTERNAL_ERROR,
            McpError::Json(_) => PARSE_ERROR,
        }
    }

    /// Structured detail attached to the error envelope.
    pub fn data(&self) -> Option<Value> {
        match self {
            McpError::Validation(v) => serde_json::to_value(v).ok(),
            McpError::CapabilityNotFound { kind, name } => Some(serde_json::json!({
                "kind": kind,
                "name": name,
            })),
            _ => None,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: JsonRpcErrorObject {
                code: self.code(),
                message: self.to_string(),
                data: self.data(),
            },
        }
    }
}

impl From<CapabilityError> for McpError {
    fn from(e: CapabilityError) -> Self {
        match e {
            CapabilityError::NotFound { kind, name } => McpError::CapabilityNotFound { kind, name },
            other @ (CapabilityError::DuplicateName { .. } | CapabilityError::DuplicateUri(_)) => {
                McpError::InternalError(other.to_string())
            }
        }
    }
}

impl From<ValidationError> for McpError {
    fn from(e: ValidationError) -> Self {
        McpError::Validation(e)
    }
}

pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_not_found_codes_per_kind() {
        let tool = McpError::CapabilityNotFound {
            kind: CapabilityKind::Tool,
            name: "x".to_string(),
        };
        assert_eq!(tool.code(), -32803);
        assert_eq!(tool.to_string(), "Tool not found: x");

        let resource = McpError::CapabilityNotFound {
            kind: CapabilityKind::Resource,
            name: "file:///x".to_string(),
        };
        assert_eq!(resource.code(), -32802);
        assert_eq!(resource.to_string(), "Resource not found: file:///x");
    }

    #[test]
    fn test_validation_envelope_carries_path() {
        let err = McpError::from(ValidationError::new("format", "one of [iso]", json!("x")));
        let envelope = err.to_json_rpc_error(RequestId::from(3));

        assert_eq!(envelope.id, RequestId::from(3));
        assert_eq!(envelope.error.code, -32602);
        assert!(envelope.error.message.starts_with("Validation error:"));
        let data = envelope.error.data.unwrap();
        assert_eq!(data["path"], "format");
        assert_eq!(data["actual"], "x");
    }

    #[test]
    fn test_capability_error_mapping() {
        let err: McpError = CapabilityError::NotFound {
            kind: CapabilityKind::Prompt,
            name: "nope".to_string(),
        }
        .into();
        assert_eq!(err.code(), -32804);

        let err: McpError = CapabilityError::DuplicateUri("file:///x".to_string()).into();
        assert_eq!(err.code(), -32603);
    }
}
