use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use super::connection::{ConnectionEntry, ConnectionId, ConnectionState};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}

/// Tracks live connections and the room keys each one has joined.
///
/// The registry keeps two indexes in sync: connection -> rooms (on the entry)
/// and room -> connections. A room key only exists in the second index while
/// it has at least one member.
///
/// It is owned by the router task and never shared, so it carries no locks.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new connection. Returns false if the id is already registered.
    pub fn register(
        &mut self,
        connection_id: ConnectionId,
        outbound: mpsc::UnboundedSender<String>,
    ) -> bool {
        if self.connections.contains_key(&connection_id) {
            return false;
        }
        self.connections
            .insert(connection_id, ConnectionEntry::new(outbound));
        true
    }

    /// Drops every membership and removes the connection.
    ///
    /// The returned entry is already in the `Disconnected` state.
    pub fn unregister(&mut self, connection_id: &ConnectionId) -> Option<ConnectionEntry> {
        self.leave_all(connection_id);
        let mut entry = self.connections.remove(connection_id)?;
        entry.state = ConnectionState::Disconnected;
        Some(entry)
    }

    /// Adds `connection_id` to `room`. Joining twice is a no-op.
    ///
    /// Returns whether the membership is new.
    pub fn join(&mut self, connection_id: &ConnectionId, room: &str) -> Result<bool, RegistryError> {
        let entry = self
            .connections
            .get_mut(connection_id)
            .ok_or(RegistryError::UnknownConnection(*connection_id))?;

        let inserted = entry.rooms.insert(room.to_string());
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(*connection_id);

        debug!(
            connection_id = %connection_id,
            room = %room,
            new_membership = inserted,
            "Joined room"
        );
        Ok(inserted)
    }

    /// Removes one membership. Returns whether anything changed.
    pub fn leave(&mut self, connection_id: &ConnectionId, room: &str) -> bool {
        let Some(entry) = self.connections.get_mut(connection_id) else {
            return false;
        };
        if !entry.rooms.remove(room) {
            return false;
        }
        self.remove_from_room_index(connection_id, room);
        debug!(connection_id = %connection_id, room = %room, "Left room");
        true
    }

    /// Removes every membership of the connection and returns the rooms it left.
    pub fn leave_all(&mut self, connection_id: &ConnectionId) -> Vec<String> {
        let Some(entry) = self.connections.get_mut(connection_id) else {
            return Vec::new();
        };
        let rooms: Vec<String> = entry.rooms.drain().collect();
        for room in &rooms {
            self.remove_from_room_index(connection_id, room);
        }
        rooms
    }

    /// Connections currently joined to `room`; empty when nobody is.
    pub fn members_of(&self, room: &str) -> HashSet<ConnectionId> {
        self.rooms.get(room).cloned().unwrap_or_default()
    }

    pub fn rooms_of(&self, connection_id: &ConnectionId) -> HashSet<String> {
        self.connections
            .get(connection_id)
            .map(|entry| entry.rooms.clone())
            .unwrap_or_default()
    }

    /// Binds the owning user id and marks the connection `Identified`
    pub fn identify(
        &mut self,
        connection_id: &ConnectionId,
        user_id: &str,
    ) -> Result<(), RegistryError> {
        let entry = self
            .connections
            .get_mut(connection_id)
            .ok_or(RegistryError::UnknownConnection(*connection_id))?;
        entry.user_id = Some(user_id.to_string());
        entry.state = ConnectionState::Identified;
        Ok(())
    }

    pub fn mark_identified(&mut self, connection_id: &ConnectionId) -> Result<(), RegistryError> {
        let entry = self
            .connections
            .get_mut(connection_id)
            .ok_or(RegistryError::UnknownConnection(*connection_id))?;
        entry.state = ConnectionState::Identified;
        Ok(())
    }

    pub fn state(&self, connection_id: &ConnectionId) -> Option<ConnectionState> {
        self.connections.get(connection_id).map(|entry| entry.state)
    }

    pub fn user_id(&self, connection_id: &ConnectionId) -> Option<&str> {
        self.connections
            .get(connection_id)
            .and_then(|entry| entry.user_id.as_deref())
    }

    pub fn outbound(&self, connection_id: &ConnectionId) -> Option<&mpsc::UnboundedSender<String>> {
        self.connections
            .get(connection_id)
            .map(|entry| entry.outbound())
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn remove_from_room_index(&mut self, connection_id: &ConnectionId, room: &str) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(connection_id);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn registered(registry: &mut ConnectionRegistry) -> ConnectionId {
        let id = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(registry.register(id, tx));
        id
    }

    #[test]
    fn test_join_then_leave_updates_membership() {
        let mut registry = ConnectionRegistry::new();
        let c = registered(&mut registry);

        registry.join(&c, "chat-1").unwrap();
        assert!(registry.members_of("chat-1").contains(&c));

        assert!(registry.leave(&c, "chat-1"));
        assert!(!registry.members_of("chat-1").contains(&c));
        assert_eq!(registry.room_count(), 0, "empty room should vanish");
    }

    #[test]
    fn test_join_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let c = registered(&mut registry);

        assert!(registry.join(&c, "u1").unwrap());
        assert!(!registry.join(&c, "u1").unwrap());

        assert_eq!(registry.members_of("u1").len(), 1);
        assert_eq!(registry.rooms_of(&c).len(), 1);
    }

    #[test]
    fn test_join_unknown_connection_fails() {
        let mut registry = ConnectionRegistry::new();
        let ghost = Uuid::new_v4();

        let result = registry.join(&ghost, "room");

        assert_eq!(result, Err(RegistryError::UnknownConnection(ghost)));
        assert!(registry.members_of("room").is_empty());
    }

    #[test]
    fn test_leave_all_clears_every_room() {
        let mut registry = ConnectionRegistry::new();
        let a = registered(&mut registry);
        let b = registered(&mut registry);

        registry.join(&a, "u1").unwrap();
        registry.join(&a, "chat-1").unwrap();
        registry.join(&b, "chat-1").unwrap();

        let mut left = registry.leave_all(&a);
        left.sort();

        assert_eq!(left, vec!["chat-1".to_string(), "u1".to_string()]);
        assert!(registry.rooms_of(&a).is_empty());
        assert!(registry.members_of("u1").is_empty());
        assert_eq!(registry.members_of("chat-1").len(), 1);
        assert!(registry.members_of("chat-1").contains(&b));
    }

    #[test]
    fn test_unregister_drops_connection() {
        let mut registry = ConnectionRegistry::new();
        let c = registered(&mut registry);
        registry.identify(&c, "u1").unwrap();
        registry.join(&c, "u1").unwrap();

        let entry = registry.unregister(&c).unwrap();

        assert_eq!(entry.state, ConnectionState::Disconnected);
        assert_eq!(entry.user_id.as_deref(), Some("u1"));
        assert!(entry.connected_at <= chrono::Utc::now());
        assert!(entry.connected_for() >= chrono::Duration::zero());
        assert!(entry.rooms.is_empty());
        assert!(!registry.contains(&c));
        assert!(registry.members_of("u1").is_empty());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_register_twice_keeps_first_entry() {
        let mut registry = ConnectionRegistry::new();
        let c = registered(&mut registry);
        registry.join(&c, "room").unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(!registry.register(c, tx));
        assert!(registry.rooms_of(&c).contains("room"));
    }

    #[test]
    fn test_identify_sets_state_and_user() {
        let mut registry = ConnectionRegistry::new();
        let c = registered(&mut registry);
        assert_eq!(registry.state(&c), Some(ConnectionState::Connected));

        registry.identify(&c, "u7").unwrap();

        assert_eq!(registry.state(&c), Some(ConnectionState::Identified));
        assert_eq!(registry.user_id(&c), Some("u7"));
    }

    #[test]
    fn test_members_of_unknown_room_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.members_of("nobody-here").is_empty());
    }
}
