use tracing::{debug, info, warn};

use crate::registry::{ConnectionId, ConnectionRegistry, ConnectionState};
use crate::websockets::{ChatMessage, ClientEvent, ServerEvent};

use super::events::{RouterCommand, RouterStats};
use super::room_router::RoomRouter;

/// Whether the router loop should keep running after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Maps router commands onto registry and router actions.
///
/// Per connection: `Connected` -> `Identified` (after `setup` / `join chat`)
/// -> `Disconnected` (terminal, all memberships dropped).
#[derive(Debug, Default)]
pub struct EventDispatcher {
    router: RoomRouter,
}

impl EventDispatcher {
    pub fn new(router: RoomRouter) -> Self {
        Self { router }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        self.router.registry()
    }

    pub fn handle(&mut self, command: RouterCommand) -> Flow {
        match command {
            RouterCommand::Connect {
                connection_id,
                outbound,
            } => {
                if self.router.registry_mut().register(connection_id, outbound) {
                    info!(connection_id = %connection_id, "Connection registered");
                } else {
                    warn!(connection_id = %connection_id, "Connection already registered");
                }
            }
            RouterCommand::Dispatch {
                connection_id,
                event,
            } => self.dispatch(&connection_id, event),
            RouterCommand::Disconnect { connection_id } => self.disconnect(&connection_id),
            RouterCommand::MembersOf { room, reply } => {
                let mut members: Vec<ConnectionId> =
                    self.registry().members_of(&room).into_iter().collect();
                members.sort();
                let _ = reply.send(members);
            }
            RouterCommand::Stats { reply } => {
                let _ = reply.send(RouterStats {
                    connections: self.registry().connection_count(),
                    rooms: self.registry().room_count(),
                });
            }
            RouterCommand::Shutdown => return Flow::Stop,
        }
        Flow::Continue
    }

    /// Applies one validated client event
    pub fn dispatch(&mut self, connection_id: &ConnectionId, event: ClientEvent) {
        let Some(state) = self.registry().state(connection_id) else {
            warn!(
                connection_id = %connection_id,
                event = event.name().as_ref(),
                "Event from unregistered connection, dropping"
            );
            return;
        };

        debug!(
            connection_id = %connection_id,
            event = event.name().as_ref(),
            state = ?state,
            "Dispatching client event"
        );

        match event {
            ClientEvent::Setup { user_id } => self.setup(connection_id, &user_id),
            ClientEvent::JoinChat { room } | ClientEvent::JoinRoom { room } => {
                self.join(connection_id, &room)
            }
            ClientEvent::LeaveChat { room } | ClientEvent::LeaveRoom { room } => {
                self.router.registry_mut().leave(connection_id, &room);
            }
            ClientEvent::NewMessage(message) => {
                if state != ConnectionState::Identified {
                    warn!(
                        connection_id = %connection_id,
                        "new message before setup or join, dropping"
                    );
                    return;
                }
                self.new_message(connection_id, message);
            }
            ClientEvent::SendMessage { room_id, content } => {
                self.router
                    .emit_to_room(&room_id, None, &ServerEvent::ReceiveMessage(content));
            }
            ClientEvent::Typing { room } => {
                self.router.emit_to_room(
                    &room,
                    Some(connection_id),
                    &ServerEvent::Typing(room.clone()),
                );
            }
            ClientEvent::StopTyping { room } => {
                self.router.emit_to_room(
                    &room,
                    Some(connection_id),
                    &ServerEvent::StopTyping(room.clone()),
                );
            }
        }
    }

    fn setup(&mut self, connection_id: &ConnectionId, user_id: &str) {
        let registry = self.router.registry_mut();
        if let Err(e) = registry
            .identify(connection_id, user_id)
            .and_then(|()| registry.join(connection_id, user_id))
        {
            warn!(connection_id = %connection_id, error = %e, "Setup failed");
            return;
        }

        info!(
            connection_id = %connection_id,
            user_id = %user_id,
            "Connection identified"
        );
        self.router
            .emit_to_connection(connection_id, &ServerEvent::Connected);
    }

    fn join(&mut self, connection_id: &ConnectionId, room: &str) {
        let registry = self.router.registry_mut();
        match registry
            .join(connection_id, room)
            .and_then(|_| registry.mark_identified(connection_id))
        {
            Ok(()) => info!(connection_id = %connection_id, room = %room, "User joined room"),
            Err(e) => warn!(connection_id = %connection_id, error = %e, "Join failed"),
        }
    }

    fn new_message(&self, connection_id: &ConnectionId, message: ChatMessage) {
        let ChatMessage {
            sender_id,
            recipient_ids,
            payload,
        } = message;

        let delivered = self.router.fan_out_to_users(
            &recipient_ids,
            &sender_id,
            &ServerEvent::MessageReceived(payload),
        );

        debug!(
            connection_id = %connection_id,
            sender_id = %sender_id,
            recipients = recipient_ids.len(),
            delivered = delivered,
            "Fanned out new message"
        );
    }

    fn disconnect(&mut self, connection_id: &ConnectionId) {
        match self.router.registry_mut().unregister(connection_id) {
            Some(entry) => info!(
                connection_id = %connection_id,
                user_id = ?entry.user_id,
                state = ?entry.state,
                connected_secs = entry.connected_for().num_seconds(),
                "Connection disconnected"
            ),
            None => debug!(connection_id = %connection_id, "Disconnect for unknown connection"),
        }
    }
}
