//! MCP prompt implementations.

pub mod time_query;
