//! git-mcp server binary
//!
//! # Usage
//!
//! ```bash
//! git-mcp [--repository <path>] [--config <file>] [--network-timeout <secs>]
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Control log verbosity (default: `git_mcp=info`)
//!
//! # Protocol
//!
//! JSON-RPC 2.0 over stdio. Responses go to stdout, logs to stderr.

use std::path::PathBuf;

use clap::Parser;
use git_mcp::{GitMcpServer, ServerConfig};

/// MCP server exposing git operations as tools
#[derive(Parser)]
#[command(name = "git-mcp")]
#[command(about = "MCP server exposing git operations as tools")]
#[command(version)]
struct Args {
    /// Default repository for calls that omit repo_path
    #[arg(short, long)]
    repository: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds before fetch, pull or push is abandoned
    #[arg(long, value_name = "SECS")]
    network_timeout: Option<u64>,

    /// Allow concurrent calls against the same repository
    #[arg(long)]
    no_path_lock: bool,
}

impl Args {
    fn into_config(self) -> git_mcp::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(repository) = self.repository {
            config.repository = Some(repository);
        }
        if let Some(secs) = self.network_timeout {
            config.network_timeout_secs = secs;
        }
        if self.no_path_lock {
            config.serialize_per_path = false;
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging to stderr (stdout is reserved for MCP protocol)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("git_mcp=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config()?;
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Refusing to start");
        return Err(e.into());
    }

    // libgit2 keeps these as process globals: set them before any worker thread exists
    git_backend::set_transfer_timeout(config.network_timeout())?;

    tracing::info!(repository = ?config.repository, timeout_secs = config.network_timeout_secs, "Starting git-mcp server");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let mut server = GitMcpServer::new(&config);
        server.run().await
    })?;

    Ok(())
}
