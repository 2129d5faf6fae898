//! The demo capability set served by the binary.

use mcp_demo::{CapabilityRegistry, CapabilityResult};

use crate::prompts::time_query;
use crate::resources::server_info;
use crate::tools::get_time;
use crate::types::{Implementation, ServerDescriptor};

/// Register the time tool, the server-info resource, and the time-query
/// prompt, in that order.
pub fn register_demo_capabilities(
    registry: &mut CapabilityRegistry,
    info_base_url: &str,
    info: &Implementation,
) -> CapabilityResult<()> {
    get_time::register(registry)?;
    server_info::register(registry, info_base_url, ServerDescriptor::new(info))?;
    time_query::register(registry)?;
    Ok(())
}
