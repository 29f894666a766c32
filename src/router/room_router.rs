use std::collections::HashSet;
use tracing::{debug, warn};

use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::websockets::ServerEvent;

/// Delivers outbound events to the connections joined to a room key.
///
/// Delivery is best-effort: a room with no members drops the event, and a
/// connection whose socket task already ended is skipped.
#[derive(Debug, Default)]
pub struct RoomRouter {
    registry: ConnectionRegistry,
}

impl RoomRouter {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ConnectionRegistry {
        &mut self.registry
    }

    /// Sends `event` to every member of `room` except `except`.
    ///
    /// Returns the number of connections the event was handed to.
    pub fn emit_to_room(
        &self,
        room: &str,
        except: Option<&ConnectionId>,
        event: &ServerEvent,
    ) -> usize {
        let members = self.registry.members_of(room);
        if members.is_empty() {
            debug!(room = %room, "No members in room, dropping event");
            return 0;
        }

        let Some(frame) = serialize(event) else {
            return 0;
        };

        let delivered = members
            .iter()
            .filter(|member| Some(*member) != except)
            .filter(|member| self.send_frame(member, &frame))
            .count();

        debug!(
            room = %room,
            members = members.len(),
            delivered = delivered,
            "Room event emitted"
        );
        delivered
    }

    /// Sends `event` to a single connection
    pub fn emit_to_connection(&self, connection_id: &ConnectionId, event: &ServerEvent) -> bool {
        match serialize(event) {
            Some(frame) => self.send_frame(connection_id, &frame),
            None => false,
        }
    }

    /// Emits `event` to the user room of every recipient except the sender.
    ///
    /// Each user room is addressed once even if the id repeats.
    pub fn fan_out_to_users(
        &self,
        recipient_ids: &[String],
        sender_id: &str,
        event: &ServerEvent,
    ) -> usize {
        let mut seen = HashSet::new();
        recipient_ids
            .iter()
            .filter(|recipient| recipient.as_str() != sender_id)
            .filter(|recipient| seen.insert(recipient.as_str()))
            .map(|recipient| self.emit_to_room(recipient, None, event))
            .sum()
    }

    fn send_frame(&self, connection_id: &ConnectionId, frame: &str) -> bool {
        match self.registry.outbound(connection_id) {
            Some(sender) => match sender.send(frame.to_string()) {
                Ok(()) => true,
                Err(_) => {
                    debug!(connection_id = %connection_id, "Outbound channel closed, skipping");
                    false
                }
            },
            None => false,
        }
    }
}

fn serialize(event: &ServerEvent) -> Option<String> {
    match event.to_frame() {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(error = %e, "Failed to serialize outbound event");
            None
        }
    }
}
