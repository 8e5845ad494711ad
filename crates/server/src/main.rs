//! eus-offline server entry point.
//!
//! Boots the offline cache router and serves its tools over MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use eus_offline_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod host;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.cache_version, "Starting eus-offline server on stdio transport");

    let host = Arc::new(host::Host::start(&config).await?);
    let handler = handler::OfflineServer::new(Arc::clone(&host));
    let server = serve_server(handler, stdio()).await?;

    tokio::select! {
        quit = server.waiting() => { quit?; }
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    host.shutdown().await;
    Ok(())
}
