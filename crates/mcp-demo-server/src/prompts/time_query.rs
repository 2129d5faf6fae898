//! Prompt: time-query. Turns a question about the time into a user message.

use chrono::Utc;
use mcp_demo::{handler_fn, CapabilityRegistry, CapabilityResult, Field, FieldType, HandlerError, Schema};
use serde_json::{Map, Value};

use crate::tools::get_time::default_time;
use crate::types::{Content, PromptGetResult, PromptMessage};

pub const NAME: &str = "time-query";

const DEFAULT_QUESTION: &str = "What time is it now?";

pub fn schema() -> Schema {
    Schema::new().field(
        Field::required("question", FieldType::String).describe("The user's question about time"),
    )
}

pub fn expand(question: &str, now: &str) -> PromptGetResult {
    let question = if question.is_empty() {
        DEFAULT_QUESTION
    } else {
        question
    };

    PromptGetResult {
        description: None,
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: Content::text(format!(
                "User asks: {question}\nAssistant answers: the current time is {now}"
            )),
        }],
    }
}

pub async fn execute(args: Map<String, Value>) -> Result<Value, HandlerError> {
    let question = args.get("question").and_then(Value::as_str).unwrap_or("");
    let result = expand(question, &default_time(Utc::now()));
    Ok(serde_json::to_value(result)?)
}

pub fn register(registry: &mut CapabilityRegistry) -> CapabilityResult<()> {
    registry.register_prompt(
        NAME,
        "Helps the user ask about the time; echoes the question with the current time",
        Some(schema()),
        handler_fn(execute),
    )
}
