//! mcp-demo: core capability library with kinds, argument schemas, the handler
//! contract, and the registry the dispatcher resolves against.

pub mod handler;
pub mod registry;
pub mod schema;
pub mod types;

pub use handler::{handler_fn, CapabilityHandler, FnHandler, HandlerError};
pub use registry::{CapabilityEntry, CapabilityRegistry, ResourceLocator};
pub use schema::{validate, Field, FieldType, Schema, ValidationError};
pub use types::*;
