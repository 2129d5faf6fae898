//! MCP resource implementations.

pub mod server_info;
