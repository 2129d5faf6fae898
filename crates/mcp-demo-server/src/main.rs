//! mcp-demo MCP server entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use mcp_demo::CapabilityKind;
use mcp_demo_server::config::{info_base_url, resolve_http_addr, resolve_info_addr, INFO_ADDR_ENV};
use mcp_demo_server::types::Implementation;
use mcp_demo_server::{McpServer, ServerMode};

#[derive(Parser)]
#[command(
    name = "mcp-demo-server",
    about = "MCP demo server with a time tool, a server-info resource, and a time-query prompt",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve {
        /// Also serve /server-info.json over HTTP on this address.
        /// Falls back to MCP_DEMO_INFO_ADDR when set.
        #[arg(long)]
        info_addr: Option<String>,
    },

    /// Start MCP server over HTTP, one session per request.
    ServeHttp {
        /// Listen address (host:port). Falls back to MCP_DEMO_HTTP_ADDR, then 127.0.0.1:3002.
        #[arg(long)]
        addr: Option<String>,
    },

    /// Print the server descriptor and registered capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   mcp-demo-server completions bash > ~/.local/share/bash-completion/completions/mcp-demo-server
    ///   mcp-demo-server completions zsh > ~/.zfunc/_mcp-demo-server
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve { info_addr: None }) {
        Commands::Serve { info_addr } => {
            let info_addr = info_addr.or_else(|| std::env::var(INFO_ADDR_ENV).ok());
            let resource_addr = resolve_info_addr(info_addr.as_deref());
            McpServer::demo(&info_base_url(&resource_addr), Implementation::default())?
                .with_mode(ServerMode::Stdio { info_addr })
                .run()
                .await?;
        }

        Commands::ServeHttp { addr } => {
            let addr = resolve_http_addr(addr.as_deref());
            McpServer::demo(&info_base_url(&addr), Implementation::default())?
                .with_mode(ServerMode::Http { addr })
                .run()
                .await?;
        }

        Commands::Info => {
            let server =
                McpServer::demo(&info_base_url(&resolve_info_addr(None)), Implementation::default())?;
            let registry = server.registry();

            let mut info = serde_json::to_value(server.descriptor())?;
            for kind in CapabilityKind::ALL {
                let names: Vec<&str> = registry
                    .list_all(kind)
                    .into_iter()
                    .map(|(name, _)| name)
                    .collect();
                info[kind.plural()] = serde_json::json!(names);
            }
            info["protocol_version"] = serde_json::json!(mcp_demo_server::types::MCP_VERSION);
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "mcp-demo-server", &mut std::io::stdout());
        }

        Commands::Repl => {
            let server =
                McpServer::demo(&info_base_url(&resolve_info_addr(None)), Implementation::default())?;
            let handler = server.session();
            let descriptor = server.descriptor();
            let runtime = tokio::runtime::Handle::current();

            tokio::task::spawn_blocking(move || {
                mcp_demo_server::repl::run(handler, descriptor, runtime)
            })
            .await??;
        }
    }

    Ok(())
}
