//! Configuration resolution: CLI flag, then environment, then default.

pub const HTTP_ADDR_ENV: &str = "MCP_DEMO_HTTP_ADDR";
pub const INFO_ADDR_ENV: &str = "MCP_DEMO_INFO_ADDR";

pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3002";
pub const DEFAULT_INFO_ADDR: &str = "127.0.0.1:3001";

/// Listen address for the per-request HTTP transport.
pub fn resolve_http_addr(explicit: Option<&str>) -> String {
    resolve(explicit, HTTP_ADDR_ENV, DEFAULT_HTTP_ADDR)
}

/// Address the static server descriptor is served from.
pub fn resolve_info_addr(explicit: Option<&str>) -> String {
    resolve(explicit, INFO_ADDR_ENV, DEFAULT_INFO_ADDR)
}

/// Base URL clients use to reach `addr`.
pub fn info_base_url(addr: &str) -> String {
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.trim_end_matches('/').to_string()
    } else {
        format!("http://{addr}")
    }
}

fn resolve(explicit: Option<&str>, env_key: &str, default: &str) -> String {
    if let Some(value) = explicit {
        return value.to_string();
    }

    match std::env::var(env_key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_wins() {
        assert_eq!(resolve_http_addr(Some("0.0.0.0:9000")), "0.0.0.0:9000");
        assert_eq!(resolve(None, "MCP_DEMO_UNSET_FOR_TEST", "d"), "d");
    }

    #[test]
    fn test_base_url() {
        assert_eq!(info_base_url("127.0.0.1:3001"), "http://127.0.0.1:3001");
        assert_eq!(info_base_url("http://host:1/"), "http://host:1");
    }
}
