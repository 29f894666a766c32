use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::websockets::ClientEvent;

use super::dispatcher::{EventDispatcher, Flow};
use super::events::{RouterCommand, RouterStats};
use super::room_router::RoomRouter;

#[derive(Debug, Error, PartialEq)]
pub enum RouterError {
    #[error("Router is not running")]
    Closed,
}

/// Cloneable handle to the router task.
///
/// Every component that needs to join rooms or emit events holds one of these;
/// the task itself owns all membership state.
#[derive(Debug, Clone)]
pub struct RouterHandle {
    commands: mpsc::UnboundedSender<RouterCommand>,
}

impl RouterHandle {
    pub fn connect(
        &self,
        connection_id: ConnectionId,
        outbound: mpsc::UnboundedSender<String>,
    ) -> Result<(), RouterError> {
        self.send(RouterCommand::Connect {
            connection_id,
            outbound,
        })
    }

    pub fn dispatch(&self, connection_id: ConnectionId, event: ClientEvent) -> Result<(), RouterError> {
        self.send(RouterCommand::Dispatch {
            connection_id,
            event,
        })
    }

    pub fn disconnect(&self, connection_id: ConnectionId) -> Result<(), RouterError> {
        self.send(RouterCommand::Disconnect { connection_id })
    }

    /// Connections currently joined to `room`, sorted
    pub async fn members_of(&self, room: &str) -> Result<Vec<ConnectionId>, RouterError> {
        let (reply, response) = oneshot::channel();
        self.send(RouterCommand::MembersOf {
            room: room.to_string(),
            reply,
        })?;
        response.await.map_err(|_| RouterError::Closed)
    }

    pub async fn stats(&self) -> Result<RouterStats, RouterError> {
        let (reply, response) = oneshot::channel();
        self.send(RouterCommand::Stats { reply })?;
        response.await.map_err(|_| RouterError::Closed)
    }

    /// Asks the router task to stop after the commands already queued
    pub fn shutdown(&self) -> Result<(), RouterError> {
        self.send(RouterCommand::Shutdown)
    }

    fn send(&self, command: RouterCommand) -> Result<(), RouterError> {
        self.commands.send(command).map_err(|_| RouterError::Closed)
    }
}

/// Starts the router task and returns a handle to it.
///
/// The task runs until `shutdown` is called or every handle is dropped.
pub fn spawn_router() -> (RouterHandle, JoinHandle<()>) {
    let (commands, receiver) = mpsc::unbounded_channel();
    let dispatcher = EventDispatcher::new(RoomRouter::new(ConnectionRegistry::new()));
    let task = tokio::spawn(run(dispatcher, receiver));
    (RouterHandle { commands }, task)
}

async fn run(mut dispatcher: EventDispatcher, mut commands: mpsc::UnboundedReceiver<RouterCommand>) {
    info!("Router task started");

    while let Some(command) = commands.recv().await {
        debug!(command = command.kind(), "Router command received");
        if dispatcher.handle(command) == Flow::Stop {
            break;
        }
    }

    info!(
        connections = dispatcher.registry().connection_count(),
        "Router task stopped"
    );
}
