use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::registry::ConnectionId;
use crate::websockets::ClientEvent;

/// Commands consumed by the router task.
///
/// Commands are processed strictly in the order they were sent, so a query
/// reply also means every earlier command has been applied.
#[derive(Debug)]
pub enum RouterCommand {
    /// A socket finished its upgrade and wants to receive events
    Connect {
        connection_id: ConnectionId,
        outbound: mpsc::UnboundedSender<String>,
    },

    /// A validated inbound event from a connection
    Dispatch {
        connection_id: ConnectionId,
        event: ClientEvent,
    },

    /// The socket closed or timed out
    Disconnect { connection_id: ConnectionId },

    MembersOf {
        room: String,
        reply: oneshot::Sender<Vec<ConnectionId>>,
    },

    Stats {
        reply: oneshot::Sender<RouterStats>,
    },

    Shutdown,
}

impl RouterCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            RouterCommand::Connect { .. } => "connect",
            RouterCommand::Dispatch { .. } => "dispatch",
            RouterCommand::Disconnect { .. } => "disconnect",
            RouterCommand::MembersOf { .. } => "members_of",
            RouterCommand::Stats { .. } => "stats",
            RouterCommand::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub connections: usize,
    pub rooms: usize,
}
