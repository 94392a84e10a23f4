use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sqltools_mcp::config::DatabaseConfig;
use sqltools_mcp::server::McpServer;
use sqltools_mcp::services::database::ConnectionManager;
use sqltools_mcp::tools::SqlTools;

fn main() -> Result<()> {
    // Stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    smol::block_on(run())
}

async fn run() -> Result<()> {
    let config = DatabaseConfig::from_env();
    let mut manager = ConnectionManager::new();

    if config.should_auto_connect() {
        info!("auto-connecting to {} database from environment", config.dbtype);
        match manager.connect(config).await {
            Ok(info) => info!("connected: {}", info.server_version),
            Err(e) => warn!("auto-connect failed, continuing without a connection: {}", e),
        }
    }

    info!("{} {} listening on stdio", sqltools_mcp::server::SERVER_TITLE, env!("CARGO_PKG_VERSION"));
    let mut server = McpServer::new(SqlTools::new(manager));
    server.serve_stdio().await?;
    Ok(())
}
