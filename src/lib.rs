// Library crate for the campus realtime server
// This file exposes the public API for integration tests

pub mod app;
pub mod config;
pub mod registry;
pub mod router;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use app::build_app;
pub use config::Config;
pub use registry::{ConnectionId, ConnectionRegistry};
pub use router::{spawn_router, RouterHandle};
pub use shared::{AppError, AppState};
pub use websockets::{ClientEvent, MessageHandler, ServerEvent, WebsocketReceiveHandler};
