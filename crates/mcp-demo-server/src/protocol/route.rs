//! Wire method routing.

use mcp_demo::CapabilityKind;

use crate::types::{McpError, McpResult};

/// What a request asks of a capability kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Call,
    Read,
    Get,
}

/// Target of a wire method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Initialize,
    Ping,
    Capability(CapabilityKind, Operation),
}

impl Route {
    pub fn parse(method: &str) -> McpResult<Self> {
        use CapabilityKind::*;
        use Operation::*;

        let route = match method {
            "initialize" => Route::Initialize,
            "ping" => Route::Ping,
            "tools/list" => Route::Capability(Tool, List),
            "tools/call" => Route::Capability(Tool, Call),
            "resources/list" => Route::Capability(Resource, List),
            "resources/read" => Route::Capability(Resource, Read),
            "prompts/list" => Route::Capability(Prompt, List),
            "prompts/get" => Route::Capability(Prompt, Get),
            other => return Err(McpError::MethodNotFound(other.to_string())),
        };
        Ok(route)
    }
}

/// Lifecycle of a single request inside the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Received,
    Validated,
    Executed,
    Responded,
}

impl std::fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DispatchStage::Received => "received",
            DispatchStage::Validated => "validated",
            DispatchStage::Executed => "executed",
            DispatchStage::Responded => "responded",
        };
        f.write_str(label)
    }
}
