// Public API
pub use handler::{websocket_handler, WebsocketReceiveHandler};
pub use messages::{
    ChatMessage, ClientEvent, Envelope, InboundEventName, ProtocolError, ServerEvent,
};
pub use socket::{CloseReason, Connection, MessageHandler, SocketError, SocketFrame, SocketWrapper};

// Internal modules
mod handler;
mod messages;
mod socket;
