//! mcp-demo MCP server: capability dispatch over stdio and per-request HTTP.

pub mod capabilities;
pub mod config;
pub mod prompts;
pub mod protocol;
pub mod repl;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;
pub mod types;

pub use capabilities::register_demo_capabilities;
pub use protocol::ProtocolHandler;
pub use server::{McpServer, ServerMode};
pub use transport::StdioTransport;
