// In-memory room membership for live connections

pub use connection::{ConnectionEntry, ConnectionId, ConnectionState};
pub use connection_registry::{ConnectionRegistry, RegistryError};

mod connection;
mod connection_registry;
