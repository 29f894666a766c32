use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier assigned to every live socket when the upgrade completes
pub type ConnectionId = Uuid;

/// Lifecycle of a single connection as seen by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// Socket is open but no identity or room has been bound yet
    Connected,
    /// Bound to at least one room key via `setup` or `join chat`
    Identified,
    /// Terminal; all memberships have been dropped
    Disconnected,
}

/// Registry entry for one live connection
#[derive(Debug)]
pub struct ConnectionEntry {
    pub user_id: Option<String>,
    pub rooms: HashSet<String>,
    pub state: ConnectionState,
    pub connected_at: DateTime<Utc>,
    outbound: mpsc::UnboundedSender<String>,
}

impl ConnectionEntry {
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            user_id: None,
            rooms: HashSet::new(),
            state: ConnectionState::Connected,
            connected_at: Utc::now(),
            outbound,
        }
    }

    /// Time since the socket was registered
    pub fn connected_for(&self) -> chrono::Duration {
        Utc::now() - self.connected_at
    }

    /// Sender half of the channel drained by the connection's socket task
    pub fn outbound(&self) -> &mpsc::UnboundedSender<String> {
        &self.outbound
    }
}
