//! The single-method contract every capability body implements.

use std::future::Future;

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Failure reported by a capability body.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::new(format!("Serialization failed: {e}"))
    }
}

/// An invocable capability body.
///
/// Receives arguments already validated against the entry's schema and
/// returns the result payload that is placed into the wire response.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    async fn invoke(&self, args: Map<String, Value>) -> Result<Value, HandlerError>;
}

/// Adapter turning an async closure into a [`CapabilityHandler`].
pub struct FnHandler<F> {
    func: F,
}

/// Wrap an async closure as a handler.
///
/// ```
/// use mcp_demo::{handler_fn, HandlerError};
/// use serde_json::{json, Map, Value};
///
/// let echo = handler_fn(|args: Map<String, Value>| async move {
///     Ok::<_, HandlerError>(json!({ "echo": args }))
/// });
/// # let _ = echo;
/// ```
pub fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    FnHandler { func }
}

#[async_trait]
impl<F, Fut> CapabilityHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    async fn invoke(&self, args: Map<String, Value>) -> Result<Value, HandlerError> {
        (self.func)(args).await
    }
}
