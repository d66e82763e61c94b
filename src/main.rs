//! Simple MCP Server - Rust Implementation
//!
//! Serves the built-in tools over stdio or HTTP, and doubles as a small
//! client for listing and calling the tools of a running server.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use simple_mcp_server_rust::builtin;
use simple_mcp_server_rust::client::McpClient;
use simple_mcp_server_rust::config::Config;
use simple_mcp_server_rust::mcp::server::Dispatcher;
use simple_mcp_server_rust::transport::{run_stdio, HttpTransport};

/// Simple MCP Server
#[derive(Parser)]
#[command(name = "simple-mcp-server")]
#[command(author, version, about = "Simple MCP Server - discoverable tools over stdio or HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tools over stdin/stdout (default)
    Stdio,

    /// Serve tools over HTTP
    Http {
        /// Bind host (overrides MCP_HTTP_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides MCP_HTTP_PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// List the tools offered by a server
    Tools {
        /// HTTP server URL; without it a stdio server is spawned
        #[arg(long)]
        url: Option<String>,
    },

    /// Call a tool on a server
    Call {
        /// Tool name
        name: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// HTTP server URL; without it a stdio server is spawned
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, stdout carries protocol frames
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Stdio) {
        Commands::Stdio => {
            let dispatcher = build_dispatcher(&config)?;
            run_stdio(&dispatcher).await?;
        }
        Commands::Http { host, port } => {
            if let Some(host) = host {
                config.http.host = host;
            }
            if let Some(port) = port {
                config.http.port = port;
            }
            let dispatcher = Arc::new(build_dispatcher(&config)?);
            HttpTransport::new(config.http).run(dispatcher).await?;
        }
        Commands::Tools { url } => {
            let mut client = connect(url).await?;
            for tool in client.tools() {
                let params: Vec<String> = tool
                    .input_schema
                    .params()
                    .iter()
                    .map(|p| {
                        let marker = if p.required { "" } else { "?" };
                        format!("{}{}: {}", p.name, marker, p.param_type)
                    })
                    .collect();
                println!("{}({}) - {}", tool.name, params.join(", "), tool.description);
            }
            client.disconnect().await;
        }
        Commands::Call { name, args, url } => {
            let args: serde_json::Value =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            let mut client = connect(url).await?;
            let result = client.call(&name, args).await;
            client.disconnect().await;
            println!("{}", result?);
        }
    }

    Ok(())
}

fn build_dispatcher(config: &Config) -> anyhow::Result<Dispatcher> {
    let registry = builtin::registry()?;
    Ok(Dispatcher::new(Arc::new(registry)).with_name(config.server_name.clone()))
}

async fn connect(url: Option<String>) -> anyhow::Result<McpClient> {
    let mut client = match url {
        Some(url) => McpClient::http(url),
        None => {
            let exe = std::env::current_exe().context("cannot locate own executable")?;
            McpClient::stdio(exe.to_string_lossy(), ["stdio"])
        }
    };
    client.connect().await?;
    Ok(client)
}
