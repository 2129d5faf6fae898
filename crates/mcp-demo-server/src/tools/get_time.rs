//! Tool: mcpDemo_getTime. Current time in one of several formats.

use chrono::{DateTime, Local, Utc};
use mcp_demo::{handler_fn, CapabilityRegistry, CapabilityResult, Field, FieldType, HandlerError, Schema};
use serde_json::{Map, Value};

use crate::types::ToolCallResult;

pub const NAME: &str = "mcpDemo_getTime";

const DESCRIPTION: &str = "Get the current time, optionally as iso, utc, or full";

/// Output shapes accepted by the `format` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// `2026-10-16T12:00:00.000Z`
    Iso,
    /// `Fri, 16 Oct 2026 12:00:00 GMT`
    Utc,
    /// Local `2026/10/16 20:00:00`
    Full,
}

impl TimeFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "iso" => Some(TimeFormat::Iso),
            "utc" => Some(TimeFormat::Utc),
            "full" => Some(TimeFormat::Full),
            _ => None,
        }
    }
}

pub fn schema() -> Schema {
    Schema::new().field(
        Field::optional("format", FieldType::one_of(["iso", "utc", "full"]))
            .describe("Time format: iso, utc, or full"),
    )
}

/// Render `now`. Without a format, uses the local long form
/// `Fri Oct 16 2026 20:00:00 GMT+0800`.
pub fn format_time(format: Option<TimeFormat>, now: DateTime<Utc>) -> String {
    match format {
        Some(TimeFormat::Iso) => now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        Some(TimeFormat::Utc) => now.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        Some(TimeFormat::Full) => now
            .with_timezone(&Local)
            .format("%Y/%-m/%-d %H:%M:%S")
            .to_string(),
        None => default_time(now),
    }
}

pub fn default_time(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local)
        .format("%a %b %d %Y %H:%M:%S GMT%z")
        .to_string()
}

pub async fn execute(args: Map<String, Value>) -> Result<Value, HandlerError> {
    let format = match args.get("format").and_then(Value::as_str) {
        Some(raw) => Some(
            TimeFormat::parse(raw)
                .ok_or_else(|| HandlerError::new(format!("unsupported format: {raw}")))?,
        ),
        None => None,
    };

    let text = format_time(format, Utc::now());
    Ok(serde_json::to_value(ToolCallResult::text(text))?)
}

pub fn register(registry: &mut CapabilityRegistry) -> CapabilityResult<()> {
    registry.register_tool(NAME, DESCRIPTION, Some(schema()), handler_fn(execute))
}
