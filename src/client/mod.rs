//! # Broker Clients
//!
//! All clients implement [`BrokerApi`]. An implementation only supplies
//! [`BrokerApi::call`], which delivers one [`Command`] and returns the raw
//! [`Answer`]; the typed operations (`acquire`, `release`, ...) are provided on
//! top of it and turn error answers into [`ClientError::Remote`].
//!
//! | Client | Transport | Use case |
//! |--------|-----------|----------|
//! | [`BrokerClient`] | TCP, one connection per call | Talking to a running broker |
//! | [`LocalBroker`] | Direct call into a [`CommandHandler`](crate::commands::CommandHandler) | Embedding and tests |

mod local;
mod render;
mod tcp;

pub use local::LocalBroker;
pub use render::{format_details, format_status_table};
pub use tcp::BrokerClient;

use crate::config::ConfigError;
use crate::protocol::{Answer, Command, ProtocolError, ResourceField};
use async_trait::async_trait;
use broker_core::ResourceStatus;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to reach the broker: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("Broker closed the connection without answering")]
    ConnectionClosed,
    #[error("{0}")]
    Remote(String),
    #[error("Answer is missing the '{0}' field")]
    UnexpectedAnswer(&'static str),
}

fn checked(answer: Answer) -> Result<Answer, ClientError> {
    if answer.is_ok() {
        Ok(answer)
    } else {
        Err(ClientError::Remote(
            answer.message.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }
}

fn granted_name(answer: Answer) -> Result<String, ClientError> {
    match answer.resource {
        Some(ResourceField::Name(name)) => Ok(name),
        _ => Err(ClientError::UnexpectedAnswer("resource")),
    }
}

/// Typed access to the broker's command set.
#[async_trait]
pub trait BrokerApi: Send + Sync {
    /// Sends one command and returns the answer as received.
    async fn call(&self, command: Command) -> Result<Answer, ClientError>;

    #[tracing::instrument(skip(self))]
    async fn status_list(&self) -> Result<Vec<ResourceStatus>, ClientError> {
        let answer = checked(self.call(Command::StatusList).await?)?;
        answer.resources.ok_or(ClientError::UnexpectedAnswer("resources"))
    }

    #[tracing::instrument(skip(self))]
    async fn resource_details(&self, name: &str) -> Result<ResourceStatus, ClientError> {
        let command = Command::ResourceDetails { name: name.to_string() };
        match checked(self.call(command).await?)?.resource {
            Some(ResourceField::Details(status)) => Ok(status),
            _ => Err(ClientError::UnexpectedAnswer("resource")),
        }
    }

    /// Blocks until a resource matching `tag` is granted to `user`.
    #[tracing::instrument(skip(self))]
    async fn acquire(&self, user: &str, tag: &str, exclusive: bool) -> Result<String, ClientError> {
        let command = Command::Acquire {
            name: user.to_string(),
            tag: tag.to_string(),
            exclusive,
        };
        granted_name(checked(self.call(command).await?)?)
    }

    #[tracing::instrument(skip(self))]
    async fn release(&self, user: &str, resource_name: &str, exclusive: bool) -> Result<String, ClientError> {
        let command = Command::Release {
            name: user.to_string(),
            resource_name: resource_name.to_string(),
            exclusive,
        };
        granted_name(checked(self.call(command).await?)?)
    }

    #[tracing::instrument(skip(self))]
    async fn shutdown(&self) -> Result<(), ClientError> {
        checked(self.call(Command::Shutdown).await?)?;
        Ok(())
    }
}
