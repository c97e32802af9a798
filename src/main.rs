use clap::Parser;
use resource_broker::config::BrokerConfig;
use resource_broker::error::BrokerError;
use resource_broker::lifecycle::tracing::setup_tracing;
use resource_broker::lifecycle::BrokerSystem;
use std::path::PathBuf;
use tracing::{error, info};

/// Hands out shared and exclusive leases on named resources.
#[derive(Debug, Parser)]
#[command(name = "resource-broker", version)]
struct Args {
    /// TOML config file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `[server] port`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Overrides `[resources] directory`.
    #[arg(short, long)]
    resources: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), BrokerError> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BrokerConfig::load(path)?,
        None => BrokerConfig::default(),
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(resources) = args.resources {
        config.resources.directory = resources;
    }

    setup_tracing(&config.logging.filter);
    info!(config = ?args.config, "Starting resource broker");

    let system = BrokerSystem::start(&config).await?;

    tokio::select! {
        _ = system.stopped() => info!("Shutdown command received"),
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Interrupted"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        },
    }

    system.shutdown().await
}
