//! # Command Handler
//!
//! Maps decoded [`Command`]s onto [`ResourceManager`] operations and renders
//! every outcome, success or failure, as an [`Answer`]. Nothing in here fails
//! the connection; errors become `status: "error"` answers.

use crate::protocol::{Answer, Command};
use broker_core::ResourceManager;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Shared by every connection task.
#[derive(Clone)]
pub struct CommandHandler {
    manager: Arc<ResourceManager>,
    stop: Arc<watch::Sender<bool>>,
}

impl CommandHandler {
    pub fn new(manager: Arc<ResourceManager>, stop: Arc<watch::Sender<bool>>) -> Self {
        Self { manager, stop }
    }

    pub fn manager(&self) -> &Arc<ResourceManager> {
        &self.manager
    }

    /// Runs one command. `trusted` tells whether the caller may run privileged commands.
    #[tracing::instrument(skip(self, command), fields(cmd = command.name()))]
    pub async fn handle(&self, command: Command, trusted: bool) -> Answer {
        if command.privileged() && !trusted {
            warn!("Privileged command from untrusted peer rejected");
            return Answer::error(format!("Command {} is not allowed from this host", command.name()));
        }

        match command {
            Command::StatusList => Answer::resources(self.manager.status_list()),

            Command::ResourceDetails { name } => match self.manager.resource_details(&name) {
                Ok(status) => Answer::resource_details(status),
                Err(e) => Answer::error(e.to_string()),
            },

            Command::Acquire { name, tag, exclusive } => {
                match self.manager.acquire(&name, &tag, exclusive).await {
                    Some(resource) => {
                        debug!(user = %name, %resource, exclusive, "Lease granted");
                        Answer::resource_name(resource)
                    }
                    None => Answer::error(format!("No resource with the given tag ({tag}) could be acquired.")),
                }
            }

            Command::Release {
                name,
                resource_name,
                exclusive,
            } => match self.manager.release(&resource_name, &name, exclusive) {
                Ok(()) => {
                    debug!(user = %name, resource = %resource_name, exclusive, "Lease released");
                    Answer::resource_name(resource_name)
                }
                Err(e) => {
                    warn!(user = %name, resource = %resource_name, error = %e, "Release failed");
                    Answer::error(e.to_string())
                }
            },

            Command::Shutdown => {
                info!("Shutdown requested");
                self.manager.shutdown();
                self.stop.send_replace(true);
                Answer::ok()
            }
        }
    }
}
