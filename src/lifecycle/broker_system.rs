use crate::client::BrokerClient;
use crate::commands::CommandHandler;
use crate::config::{BrokerConfig, ServerConfig};
use crate::error::BrokerError;
use crate::server::BrokerServer;
use broker_core::ResourceManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// A running broker: the resource manager plus the TCP server in front of it.
///
/// `BrokerSystem` is responsible for:
/// - **Wiring**: loading the resources and handing the manager to the command layer
/// - **Serving**: binding the listener and running the accept loop in its own task
/// - **Shutdown**: stopping the manager and the listener together, whether the
///   request comes from [`shutdown`](Self::shutdown) or from a remote `shutdown` command
///
/// # Example
///
/// ```ignore
/// let system = BrokerSystem::start(&config).await?;
/// let client = system.client();
///
/// let resource = client.acquire("alice", "build", false).await?;
/// client.release("alice", &resource, false).await?;
///
/// system.shutdown().await?;
/// ```
pub struct BrokerSystem {
    manager: Arc<ResourceManager>,
    local_addr: SocketAddr,
    stop: Arc<watch::Sender<bool>>,
    handle: JoinHandle<()>,
}

impl BrokerSystem {
    /// Loads the resources from `config.resources.directory` and starts serving.
    pub async fn start(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let manager = ResourceManager::load(&config.resources.directory);
        Self::start_with_manager(config.server.clone(), manager).await
    }

    pub async fn start_with_manager(server: ServerConfig, manager: ResourceManager) -> Result<Self, BrokerError> {
        let manager = Arc::new(manager);
        let (stop, stopped) = watch::channel(false);
        let stop = Arc::new(stop);

        let handler = CommandHandler::new(manager.clone(), stop.clone());
        let server = BrokerServer::bind(server, handler).await?;
        let local_addr = server.local_addr()?;
        let handle = tokio::spawn(server.run(stopped));

        info!(%local_addr, "Broker started");
        Ok(Self {
            manager,
            local_addr,
            stop,
            handle,
        })
    }

    pub fn manager(&self) -> &Arc<ResourceManager> {
        &self.manager
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A network client pointed at this broker.
    pub fn client(&self) -> BrokerClient {
        BrokerClient::new(self.local_addr.to_string())
    }

    /// Resolves once a shutdown has been requested.
    pub async fn stopped(&self) {
        let mut stopped = self.stop.subscribe();
        let _ = stopped.wait_for(|stopped| *stopped).await;
    }

    /// Stops the manager, which releases every blocked acquire, and waits for
    /// the accept loop to exit.
    pub async fn shutdown(self) -> Result<(), BrokerError> {
        info!("Shutting down broker...");
        self.manager.shutdown();
        self.stop.send_replace(true);
        self.handle.await?;
        info!("Broker shutdown complete.");
        Ok(())
    }
}
