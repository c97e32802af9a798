use clap::{Parser, Subcommand};
use resource_broker::client::{format_details, format_status_table, BrokerApi, BrokerClient, ClientError};
use resource_broker::config::BrokerConfig;
use resource_broker::lifecycle::tracing::setup_tracing;
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line client for a running resource broker.
#[derive(Debug, Parser)]
#[command(name = "broker-client", version)]
struct Args {
    /// TOML config file; only the `[client]` section is used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Broker address as `host:port`. Overrides the config file.
    #[arg(short, long)]
    address: Option<String>,

    /// User name to acquire and release leases under. Overrides `client_name`.
    #[arg(short, long)]
    user: Option<String>,

    #[command(subcommand)]
    command: ClientCommand,
}

#[derive(Debug, Subcommand)]
enum ClientCommand {
    /// Lists every resource with its free slots and users.
    Status,
    /// Shows one resource including its parameters.
    Details { name: String },
    /// Waits for a resource carrying `tag` and prints its name.
    Acquire {
        tag: String,
        #[arg(short, long)]
        exclusive: bool,
    },
    /// Gives back a lease on `resource`.
    Release {
        resource: String,
        #[arg(short, long)]
        exclusive: bool,
    },
    /// Stops the broker. Only accepted from trusted hosts.
    Shutdown,
}

async fn run(args: Args) -> Result<(), ClientError> {
    let config = match &args.config {
        Some(path) => BrokerConfig::load(path)?,
        None => BrokerConfig::default(),
    };
    setup_tracing("warn");

    let client = match args.address {
        Some(address) => BrokerClient::new(address),
        None => BrokerClient::from_config(&config.client),
    };
    let user = args.user.unwrap_or(config.client.client_name);

    match args.command {
        ClientCommand::Status => print!("{}", format_status_table(&client.status_list().await?)),
        ClientCommand::Details { name } => print!("{}", format_details(&client.resource_details(&name).await?)),
        ClientCommand::Acquire { tag, exclusive } => println!("{}", client.acquire(&user, &tag, exclusive).await?),
        ClientCommand::Release { resource, exclusive } => {
            client.release(&user, &resource, exclusive).await?;
        }
        ClientCommand::Shutdown => client.shutdown().await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
