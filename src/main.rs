use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use toolgate::{
    config::{ConfigOverrides, GatewayConfig},
    logging,
    server::{self, AppState},
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "toolgate", version, about = "Authorization-aware realtime tool-call gateway")]
struct Cli {
    /// YAML configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = GatewayConfig::load(cli.config.as_deref())
        .await
        .context("failed to load configuration")?;
    config.apply_overrides(cli.overrides);
    config.validate().context("configuration rejected")?;

    logging::init_logging(&config.log).context("failed to initialize logging")?;
    if config.upstream.api_key.is_none() {
        tracing::warn!("No upstream API key configured; upstream may reject sessions");
    }

    info!(
        host = %config.server.host,
        port = config.server.port,
        upstream = %config.upstream.url,
        max_connections = config.relay.max_connections,
        "Starting toolgate"
    );

    let state = Arc::new(AppState::new(config));
    server::serve(state, shutdown_signal())
        .await
        .context("server error")?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
