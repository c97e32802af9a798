//! # TCP Server
//!
//! Accepts connections and serves each one in its own task. A connection is a
//! sequence of request/answer frames; it ends when the client hangs up or sends
//! something that is not a JSON frame.

use crate::commands::CommandHandler;
use crate::config::ServerConfig;
use crate::error::BrokerError;
use crate::protocol::{read_frame, write_message, Answer, Command, ResourceField};
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub struct BrokerServer {
    listener: TcpListener,
    handler: CommandHandler,
    config: ServerConfig,
}

impl BrokerServer {
    pub async fn bind(config: ServerConfig, handler: CommandHandler) -> Result<Self, BrokerError> {
        let address = config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| BrokerError::Bind { address, source })?;
        Ok(Self {
            listener,
            handler,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, BrokerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `stop` turns true or its sender is dropped.
    ///
    /// Connections already being served are left to finish on their own.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        info!(address = ?self.listener.local_addr().ok(), "Broker listening");

        loop {
            tokio::select! {
                _ = stop.wait_for(|stopped| *stopped) => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let trusted = self.config.is_trusted(peer.ip());
                        let handler = self.handler.clone();
                        let max_frame_len = self.config.max_frame_len;
                        tokio::spawn(serve_connection(stream, peer, handler, trusted, max_frame_len));
                    }
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
            }
        }

        info!("Broker stopped accepting connections");
    }
}

#[tracing::instrument(skip_all, fields(%peer, trusted = trusted))]
async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: CommandHandler,
    trusted: bool,
    max_frame_len: usize,
) {
    debug!("Connection opened");

    loop {
        let body = match read_frame(&mut stream, max_frame_len).await {
            Ok(Some(body)) => body,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Protocol error, closing connection");
                break;
            }
        };

        let request: Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Malformed JSON, closing connection");
                break;
            }
        };

        let command = match serde_json::from_value::<Command>(request) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "Invalid request");
                let answer = Answer::error(format!("Invalid request: {e}"));
                if let Err(e) = write_message(&mut stream, &answer).await {
                    warn!(error = %e, "Failed to send answer, closing connection");
                    break;
                }
                continue;
            }
        };

        let lease_user = match &command {
            Command::Acquire { name, .. } => Some(name.clone()),
            _ => None,
        };

        // A blocked acquire is abandoned when the peer hangs up. Handling is
        // polled first so commands that finish without waiting always run.
        let answer = tokio::select! {
            biased;
            answer = handler.handle(command, trusted) => answer,
            _ = peer_closed(&stream) => {
                debug!("Peer closed the connection while waiting");
                break;
            }
        };

        if let Err(e) = write_message(&mut stream, &answer).await {
            warn!(error = %e, "Failed to send answer, closing connection");
            if let (Some(user), Some(ResourceField::Name(resource))) = (lease_user, &answer.resource) {
                return_undelivered_lease(&handler, resource, &user);
            }
            break;
        }
    }

    debug!("Connection closed");
}

/// Resolves once the peer has closed its side of the connection.
///
/// Pipelined data from the peer means it is still there; in that case this
/// never resolves.
async fn peer_closed(stream: &TcpStream) {
    let mut buf = [0u8; 1];
    match stream.peek(&mut buf).await {
        Ok(0) | Err(_) => {}
        Ok(_) => std::future::pending::<()>().await,
    }
}

fn return_undelivered_lease(handler: &CommandHandler, resource: &str, user: &str) {
    // a normal release also ends an exclusive lease completely
    match handler.manager().release(resource, user, false) {
        Ok(()) => info!(%resource, %user, "Returned lease that could not be delivered"),
        Err(e) => warn!(%resource, %user, error = %e, "Could not return undelivered lease"),
    }
}
