use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant};
use tracing::debug;

use crate::registry::ConnectionId;
use crate::router::RouterError;

/// One frame read from the client
#[derive(Debug, PartialEq)]
pub enum SocketFrame {
    Text(String),
    /// Binary, ping or pong; counts as activity but carries no event
    Control,
    Closed,
}

/// Simple WebSocket abstraction - all we care about is send/receive
#[async_trait]
pub trait SocketWrapper: Send {
    /// Send a text message to the client
    async fn send_message(&mut self, message: String) -> Result<(), SocketError>;

    /// Send a heartbeat ping; the client's pong arrives as a control frame
    async fn send_ping(&mut self) -> Result<(), SocketError>;

    /// Receive the next frame from the client
    async fn receive_message(&mut self) -> Result<SocketFrame, SocketError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Handler for incoming WebSocket messages
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle an incoming text frame from the client.
    ///
    /// An error means the router is gone and the connection should end.
    async fn handle_message(
        &self,
        connection_id: &ConnectionId,
        message: String,
    ) -> Result<(), RouterError>;
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// Why a connection loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    ClientClosed,
    IdleTimeout,
    RouterClosed,
}

/// Direct implementation on axum's WebSocket
#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.send(Message::Text(message))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn send_ping(&mut self) -> Result<(), SocketError> {
        self.send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_message(&mut self) -> Result<SocketFrame, SocketError> {
        match self.next().await {
            Some(Ok(Message::Text(text))) => Ok(SocketFrame::Text(text)),
            Some(Ok(Message::Close(_))) => Ok(SocketFrame::Closed),
            Some(Ok(_)) => Ok(SocketFrame::Control),
            Some(Err(e)) => Err(SocketError::ReceiveFailed(e.to_string())),
            None => Ok(SocketFrame::Closed),
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// Heartbeats sent per idle timeout window, so a live client gets several
/// chances to pong before the deadline
const HEARTBEATS_PER_TIMEOUT: u32 = 3;

/// Connection represents a managed WebSocket connection.
///
/// Inbound frames go to the message handler; the outbound receiver is fed by
/// the router whenever this connection is a member of a room being emitted to.
pub struct Connection {
    pub connection_id: ConnectionId,
    socket: Box<dyn SocketWrapper>,
    outbound_receiver: mpsc::UnboundedReceiver<String>,
    message_handler: Arc<dyn MessageHandler>,
    idle_timeout: Duration,
}

impl Connection {
    pub fn new(
        connection_id: ConnectionId,
        socket: Box<dyn SocketWrapper>,
        outbound_receiver: mpsc::UnboundedReceiver<String>,
        message_handler: Arc<dyn MessageHandler>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            connection_id,
            socket,
            outbound_receiver,
            message_handler,
            idle_timeout,
        }
    }

    /// Run the connection - handles both sending and receiving until disconnect.
    ///
    /// The server pings at a fraction of the idle timeout; any inbound frame,
    /// pongs included, pushes the idle deadline back.
    pub async fn run(mut self) -> Result<CloseReason, SocketError> {
        let idle = sleep(self.idle_timeout);
        tokio::pin!(idle);

        // interval_at panics on a zero period
        let heartbeat_period =
            (self.idle_timeout / HEARTBEATS_PER_TIMEOUT).max(Duration::from_millis(1));
        let mut heartbeat = interval_at(Instant::now() + heartbeat_period, heartbeat_period);

        let reason = loop {
            tokio::select! {
                // Handle outbound messages (from the router to the client)
                msg = self.outbound_receiver.recv() => {
                    match msg {
                        Some(message) => self.socket.send_message(message).await?,
                        None => break CloseReason::RouterClosed,
                    }
                }

                // Handle inbound messages (from the client to the router)
                frame = self.socket.receive_message() => {
                    idle.as_mut().reset(Instant::now() + self.idle_timeout);
                    match frame? {
                        SocketFrame::Text(message) => {
                            if self
                                .message_handler
                                .handle_message(&self.connection_id, message)
                                .await
                                .is_err()
                            {
                                break CloseReason::RouterClosed;
                            }
                        }
                        SocketFrame::Control => {}
                        SocketFrame::Closed => break CloseReason::ClientClosed,
                    }
                }

                _ = heartbeat.tick() => {
                    self.socket.send_ping().await?;
                }

                () = &mut idle => {
                    debug!(connection_id = %self.connection_id, "Idle timeout reached");
                    break CloseReason::IdleTimeout;
                }
            }
        };

        // Clean disconnect
        let _ = self.socket.close().await;
        Ok(reason)
    }
}
