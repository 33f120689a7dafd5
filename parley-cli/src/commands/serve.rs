//! Parley serve command for running the relay server
//!
//! Settings come from the layered config files; `--host` and `--port` override
//! them. Ctrl-C shuts the server down, closing every client connection.

use anyhow::Result;
use clap::Args;
use parley_server::{ParleyServer, ServerConfig};
use tracing::{info, warn};

use crate::config::{ConfigLoader, ParleyConfig};

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = server_config(ConfigLoader::load()?, &args);

    info!("Starting parley server on {}", config.addr());

    let server = ParleyServer::new(config);
    let shutdown = server.shutdown_token();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
        shutdown.cancel();
    });

    server.run().await.map_err(Into::into)
}

/// Resolve the server configuration; flags win over config files
fn server_config(config: ParleyConfig, args: &ServeArgs) -> ServerConfig {
    let mut server = config.server.to_server_config();
    if let Some(host) = &args.host {
        server.host = host.clone();
    }
    if let Some(port) = args.port {
        server.port = port;
    }
    server
}
