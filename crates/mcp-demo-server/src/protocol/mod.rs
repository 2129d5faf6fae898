//! MCP protocol handling: JSON-RPC dispatch.

pub mod handler;
pub mod negotiation;
pub mod route;
pub mod validator;

pub use handler::ProtocolHandler;
pub use route::{DispatchStage, Operation, Route};
