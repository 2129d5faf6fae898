//! MCP tool implementations.

pub mod get_time;
