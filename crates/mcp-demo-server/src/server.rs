//! MCP server orchestration.

use std::sync::Arc;

use mcp_demo::{CapabilityRegistry, CapabilityResult};
use tracing::info;

use crate::capabilities::register_demo_capabilities;
use crate::protocol::ProtocolHandler;
use crate::transport::StdioTransport;
use crate::types::{Implementation, McpError, McpResult, ServerDescriptor};

/// Which transport binding the server runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMode {
    /// One persistent session over stdin/stdout. With `info_addr`, the static
    /// descriptor is also served over HTTP.
    Stdio { info_addr: Option<String> },
    /// One ephemeral session per `POST /mcp`.
    Http { addr: String },
}

impl Default for ServerMode {
    fn default() -> Self {
        ServerMode::Stdio { info_addr: None }
    }
}

/// MCP server: a frozen registry bound to one transport.
pub struct McpServer {
    registry: Arc<CapabilityRegistry>,
    info: Implementation,
    mode: ServerMode,
}

impl McpServer {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            info: Implementation::default(),
            mode: ServerMode::default(),
        }
    }

    /// The demo capability set. `server-info` reads, `initialize` and
    /// `/server-info.json` all report `info`.
    pub fn demo(info_base_url: &str, info: Implementation) -> CapabilityResult<Self> {
        let mut registry = CapabilityRegistry::new();
        register_demo_capabilities(&mut registry, info_base_url, &info)?;
        Ok(Self::new(registry).with_info(info))
    }

    /// Identity reported at `initialize` and on `/server-info.json`.
    /// Resources already in the registry are not re-registered.
    pub fn with_info(mut self, info: Implementation) -> Self {
        self.info = info;
        self
    }

    pub fn with_mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn registry(&self) -> Arc<CapabilityRegistry> {
        self.registry.clone()
    }

    /// A fresh dispatcher sharing this server's registry.
    pub fn session(&self) -> ProtocolHandler {
        ProtocolHandler::new(self.registry.clone(), self.info.clone())
    }

    pub fn descriptor(&self) -> ServerDescriptor {
        ServerDescriptor::new(&self.info)
    }

    /// Run until the transport finishes. Failing to bind is fatal.
    pub async fn run(&self) -> McpResult<()> {
        match &self.mode {
            ServerMode::Stdio { info_addr } => {
                info!("Starting MCP server in stdio mode");
                let info_task = match info_addr {
                    Some(addr) => Some(self.spawn_info_server(addr).await?),
                    None => None,
                };

                let result = StdioTransport::new(self.session()).run().await;
                if let Some(task) = info_task {
                    task.abort();
                }
                result
            }
            ServerMode::Http { addr } => {
                info!("Starting MCP server in HTTP mode on {addr}");
                self.run_http(addr).await
            }
        }
    }

    #[cfg(feature = "http")]
    async fn run_http(&self, addr: &str) -> McpResult<()> {
        crate::transport::HttpTransport::new(self.registry.clone(), self.info.clone())
            .run(addr)
            .await
    }

    #[cfg(not(feature = "http"))]
    async fn run_http(&self, _addr: &str) -> McpResult<()> {
        Err(McpError::Transport(
            "built without the `http` feature".to_string(),
        ))
    }

    #[cfg(feature = "http")]
    async fn spawn_info_server(&self, addr: &str) -> McpResult<tokio::task::JoinHandle<()>> {
        use crate::transport::http;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;
        info!("Server info available at http://{addr}/server-info.json");

        let router = http::info_router(self.descriptor());
        Ok(tokio::spawn(async move {
            if let Err(e) = http::serve(listener, router).await {
                tracing::error!("Server info endpoint stopped: {e}");
            }
        }))
    }

    #[cfg(not(feature = "http"))]
    async fn spawn_info_server(&self, _addr: &str) -> McpResult<tokio::task::JoinHandle<()>> {
        Err(McpError::Transport(
            "built without the `http` feature".to_string(),
        ))
    }
}
