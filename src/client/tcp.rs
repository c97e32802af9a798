use super::{BrokerApi, ClientError};
use crate::config::{ClientConfig, DEFAULT_MAX_FRAME_LEN};
use crate::protocol::{read_message, write_message, Answer, Command};
use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

/// Network client for a running broker.
///
/// Every call opens a fresh connection, sends one request and waits for its
/// answer, so a blocked `acquire` only ties up its own connection.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    address: String,
    max_frame_len: usize,
}

impl BrokerClient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(format!("{}:{}", config.hostname, config.port))
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl BrokerApi for BrokerClient {
    async fn call(&self, command: Command) -> Result<Answer, ClientError> {
        debug!(address = %self.address, cmd = command.name(), "Sending request");
        let mut stream = TcpStream::connect(&self.address).await?;
        write_message(&mut stream, &command).await?;
        read_message(&mut stream, self.max_frame_len)
            .await?
            .ok_or(ClientError::ConnectionClosed)
    }
}
