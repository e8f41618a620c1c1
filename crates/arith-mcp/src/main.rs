use anyhow::{Context, Result};
use arith_mcp::config::Config;
use arith_mcp::server::Server;
use arith_mcp::{demo, mcp};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(version, about = "Arithmetic MCP server and client over streamable HTTP")]
struct Opts {
    /// TOML config file. Flags and environment variables override its values.
    #[clap(long, env = "ARITH_MCP_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    subcmd: ArithSubcommand,
}

#[derive(Subcommand)]
enum ArithSubcommand {
    /// Serve the arithmetic tools, resources and prompts.
    Serve {
        #[clap(long, env = "ARITH_MCP_HOST")]
        host: Option<String>,

        #[clap(long, short, env = "ARITH_MCP_PORT")]
        port: Option<u16>,

        /// Endpoint path, e.g. /mcp
        #[clap(long, env = "ARITH_MCP_PATH")]
        path: Option<String>,

        /// Do not issue or require session ids.
        #[clap(long, env = "ARITH_MCP_STATELESS")]
        stateless: bool,

        /// Answer requests with plain JSON bodies instead of event streams.
        #[clap(long, env = "ARITH_MCP_JSON_RESPONSE")]
        json_response: bool,
    },

    /// Run every MCP operation once against a running server.
    Demo {
        #[clap(long, env = "ARITH_MCP_URL")]
        url: Option<String>,

        #[clap(long, env = "ARITH_MCP_TIMEOUT_SECS")]
        timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let mut config = Config::load(opts.config.as_deref())?;

    match opts.subcmd {
        ArithSubcommand::Serve {
            host,
            port,
            path,
            stateless,
            json_response,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(path) = path {
                config.server.path = path;
            }
            config.server.stateless |= stateless;
            config.server.json_response |= json_response;
            config.validate()?;

            serve(config).await
        }
        ArithSubcommand::Demo { url, timeout_secs } => {
            if let Some(url) = url {
                config.client.url = url;
            }
            if let Some(timeout_secs) = timeout_secs {
                config.client.timeout_secs = timeout_secs;
            }
            config.validate()?;

            demo::run(&config.client).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let settings = config.server;
    let dispatcher = mcp::build_dispatcher(&settings.name).context("Failed to register catalog")?;

    let addr = settings.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    let local = listener.local_addr()?;
    println!(
        "{} {}",
        "MCP endpoint:".bold(),
        format!("http://{}{}", local, settings.path).bright_purple()
    );

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down");
            shutdown.cancel();
        }
    });

    Server::new(dispatcher, settings, token).serve(listener).await
}
