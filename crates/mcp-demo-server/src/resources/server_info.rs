//! Resource: server-info. The static server descriptor.

use mcp_demo::{handler_fn, CapabilityRegistry, CapabilityResult, HandlerError};
use serde_json::{Map, Value};

use crate::types::{ReadResourceResult, ResourceContent, ServerDescriptor};

pub const NAME: &str = "server-info";
pub const PATH: &str = "/server-info.json";
pub const MIME_TYPE: &str = "application/json";

/// Resource URI under `base_url`, e.g. `http://127.0.0.1:3001/server-info.json`.
pub fn uri(base_url: &str) -> String {
    format!("{}{PATH}", base_url.trim_end_matches('/'))
}

pub fn read(uri: &str, descriptor: &ServerDescriptor) -> ReadResourceResult {
    ReadResourceResult {
        contents: vec![ResourceContent {
            uri: uri.to_string(),
            mime_type: Some(MIME_TYPE.to_string()),
            text: Some(descriptor.to_pretty_json()),
        }],
    }
}

pub fn register(
    registry: &mut CapabilityRegistry,
    base_url: &str,
    descriptor: ServerDescriptor,
) -> CapabilityResult<()> {
    let uri = uri(base_url);
    let served = uri.clone();
    registry.register_resource(
        NAME,
        uri,
        "Server name, version, and capability kinds",
        Some(MIME_TYPE.to_string()),
        handler_fn(move |_args: Map<String, Value>| {
            let result = read(&served, &descriptor);
            async move { Ok::<_, HandlerError>(serde_json::to_value(result)?) }
        }),
    )
}
