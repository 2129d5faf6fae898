//! MCP capability negotiation during initialization.

use crate::types::{
    ClientCapabilities, Implementation, InitializeParams, InitializeResult, McpResult,
    ServerCapabilities, MCP_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};

/// Client state recorded by one session's `initialize` handshake.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    pub client: ClientCapabilities,
    pub client_info: Option<Implementation>,
    pub protocol_version: Option<String>,
    pub initialized: bool,
}

impl NegotiatedCapabilities {
    pub fn negotiate(
        &mut self,
        params: InitializeParams,
        server_info: &Implementation,
        capabilities: ServerCapabilities,
    ) -> McpResult<InitializeResult> {
        let version = if SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            params.protocol_version
        } else {
            tracing::warn!(
                "Client requested protocol version {}, proceeding with {}",
                params.protocol_version,
                MCP_VERSION
            );
            MCP_VERSION.to_string()
        };

        tracing::info!(
            "Initialized with client: {} v{}",
            params.client_info.name,
            params.client_info.version
        );

        self.client = params.capabilities;
        self.client_info = Some(params.client_info);
        self.protocol_version = Some(version.clone());

        Ok(InitializeResult {
            protocol_version: version,
            capabilities,
            server_info: server_info.clone(),
            instructions: None,
        })
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
        tracing::debug!("MCP handshake complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(version: &str) -> InitializeParams {
        InitializeParams {
            protocol_version: version.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "test-client".to_string(),
                version: "1.0.0".to_string(),
            },
        }
    }

    #[test]
    fn test_supported_version_is_echoed() {
        let mut caps = NegotiatedCapabilities::default();
        let result = caps
            .negotiate(
                params("2024-11-05"),
                &Implementation::default(),
                ServerCapabilities::default(),
            )
            .unwrap();
        assert_eq!(result.protocol_version, "2024-11-05");
        assert_eq!(caps.client_info.unwrap().name, "test-client");
    }

    #[test]
    fn test_unknown_version_falls_back() {
        let mut caps = NegotiatedCapabilities::default();
        let result = caps
            .negotiate(
                params("1999-01-01"),
                &Implementation::default(),
                ServerCapabilities::default(),
            )
            .unwrap();
        assert_eq!(result.protocol_version, MCP_VERSION);
        assert!(!caps.initialized);
        caps.mark_initialized();
        assert!(caps.initialized);
    }
}
