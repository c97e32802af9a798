//! In-process client.
//!
//! `LocalBroker` runs commands straight through a [`CommandHandler`] without
//! framing or sockets. It behaves exactly like a [`BrokerClient`](super::BrokerClient)
//! connected from a trusted host, which makes it the fastest way to exercise
//! the command layer in tests:
//!
//! ```rust
//! use resource_broker::client::{BrokerApi, LocalBroker};
//! use broker_core::{Resource, ResourceManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = ResourceManager::new([Resource::new("build01", 1).unwrap()]);
//!     let broker = LocalBroker::new(manager);
//!
//!     let granted = broker.acquire("alice", "build01", false).await.unwrap();
//!     assert_eq!(granted, "build01");
//!     assert_eq!(broker.status_list().await.unwrap()[0].free, 0);
//! }
//! ```

use super::{BrokerApi, ClientError};
use crate::commands::CommandHandler;
use crate::protocol::{Answer, Command};
use async_trait::async_trait;
use broker_core::ResourceManager;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct LocalBroker {
    handler: CommandHandler,
    stopped: watch::Receiver<bool>,
}

impl LocalBroker {
    pub fn new(manager: ResourceManager) -> Self {
        let (stop, stopped) = watch::channel(false);
        Self {
            handler: CommandHandler::new(Arc::new(manager), Arc::new(stop)),
            stopped,
        }
    }

    pub fn from_handler(handler: CommandHandler, stopped: watch::Receiver<bool>) -> Self {
        Self { handler, stopped }
    }

    pub fn manager(&self) -> &Arc<ResourceManager> {
        self.handler.manager()
    }

    /// True once a `shutdown` command went through.
    pub fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }
}

#[async_trait]
impl BrokerApi for LocalBroker {
    async fn call(&self, command: Command) -> Result<Answer, ClientError> {
        Ok(self.handler.handle(command, true).await)
    }
}
