use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use strum_macros::{AsRefStr, EnumString};
use thiserror::Error;

/// Event names a client may send
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
pub enum InboundEventName {
    #[strum(serialize = "setup")]
    Setup,
    #[strum(serialize = "join chat")]
    JoinChat,
    #[strum(serialize = "joinRoom")]
    JoinRoom,
    #[strum(serialize = "leave chat")]
    LeaveChat,
    #[strum(serialize = "leaveRoom")]
    LeaveRoom,
    #[strum(serialize = "new message")]
    NewMessage,
    #[strum(serialize = "sendMessage")]
    SendMessage,
    #[strum(serialize = "typing")]
    Typing,
    #[strum(serialize = "stop typing")]
    StopTyping,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid JSON frame: {0}")]
    InvalidJson(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Malformed payload for '{event}': {reason}")]
    MalformedPayload { event: String, reason: String },
}

impl ProtocolError {
    fn malformed(event: InboundEventName, reason: impl Into<String>) -> Self {
        ProtocolError::MalformedPayload {
            event: event.as_ref().to_string(),
            reason: reason.into(),
        }
    }
}

/// Raw frame as it arrives on the socket: `{"event": ..., "data": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Routing view of a `new message` payload.
///
/// Only the routing keys are extracted; `payload` is forwarded verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub sender_id: String,
    pub recipient_ids: Vec<String>,
    pub payload: Value,
}

impl ChatMessage {
    fn from_payload(payload: Value) -> Result<Self, ProtocolError> {
        let users = payload
            .get("chat")
            .and_then(|chat| chat.get("users"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ProtocolError::malformed(InboundEventName::NewMessage, "chat.users not defined")
            })?;

        let recipient_ids = users
            .iter()
            .map(|user| {
                identity_of(user).ok_or_else(|| {
                    ProtocolError::malformed(
                        InboundEventName::NewMessage,
                        "chat.users entry has no _id",
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sender_id = payload
            .get("sender")
            .and_then(identity_of)
            .ok_or_else(|| {
                ProtocolError::malformed(InboundEventName::NewMessage, "sender._id not defined")
            })?;

        Ok(Self {
            sender_id,
            recipient_ids,
            payload,
        })
    }
}

/// Validated inbound event, one variant per event name
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Setup { user_id: String },
    JoinChat { room: String },
    JoinRoom { room: String },
    LeaveChat { room: String },
    LeaveRoom { room: String },
    NewMessage(ChatMessage),
    SendMessage { room_id: String, content: Value },
    Typing { room: String },
    StopTyping { room: String },
}

impl ClientEvent {
    /// Parses and validates a text frame
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(frame)
            .map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let name = InboundEventName::from_str(&envelope.event)
            .map_err(|_| ProtocolError::UnknownEvent(envelope.event.clone()))?;
        let data = envelope.data;

        let event = match name {
            InboundEventName::Setup => ClientEvent::Setup {
                user_id: identity_of(&data)
                    .ok_or_else(|| ProtocolError::malformed(name, "expected a user id"))?,
            },
            InboundEventName::JoinChat => ClientEvent::JoinChat {
                room: room_key(name, &data)?,
            },
            InboundEventName::JoinRoom => ClientEvent::JoinRoom {
                room: room_key(name, &data)?,
            },
            InboundEventName::LeaveChat => ClientEvent::LeaveChat {
                room: room_key(name, &data)?,
            },
            InboundEventName::LeaveRoom => ClientEvent::LeaveRoom {
                room: room_key(name, &data)?,
            },
            InboundEventName::NewMessage => ClientEvent::NewMessage(ChatMessage::from_payload(data)?),
            InboundEventName::SendMessage => {
                let room_id = data
                    .get("roomId")
                    .and_then(Value::as_str)
                    .filter(|room| !room.is_empty())
                    .ok_or_else(|| ProtocolError::malformed(name, "roomId not defined"))?
                    .to_string();
                let content = data
                    .get("content")
                    .cloned()
                    .ok_or_else(|| ProtocolError::malformed(name, "content not defined"))?;
                ClientEvent::SendMessage { room_id, content }
            }
            InboundEventName::Typing => ClientEvent::Typing {
                room: room_key(name, &data)?,
            },
            InboundEventName::StopTyping => ClientEvent::StopTyping {
                room: room_key(name, &data)?,
            },
        };

        Ok(event)
    }

    pub fn name(&self) -> InboundEventName {
        match self {
            ClientEvent::Setup { .. } => InboundEventName::Setup,
            ClientEvent::JoinChat { .. } => InboundEventName::JoinChat,
            ClientEvent::JoinRoom { .. } => InboundEventName::JoinRoom,
            ClientEvent::LeaveChat { .. } => InboundEventName::LeaveChat,
            ClientEvent::LeaveRoom { .. } => InboundEventName::LeaveRoom,
            ClientEvent::NewMessage(_) => InboundEventName::NewMessage,
            ClientEvent::SendMessage { .. } => InboundEventName::SendMessage,
            ClientEvent::Typing { .. } => InboundEventName::Typing,
            ClientEvent::StopTyping { .. } => InboundEventName::StopTyping,
        }
    }
}

/// Events the server pushes to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "connected")]
    Connected,
    #[serde(rename = "message received")]
    MessageReceived(Value),
    #[serde(rename = "receiveMessage")]
    ReceiveMessage(Value),
    #[serde(rename = "typing")]
    Typing(String),
    #[serde(rename = "stop typing")]
    StopTyping(String),
}

impl ServerEvent {
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Accepts either a bare string id or an object carrying `_id`
fn identity_of(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(id) => id.as_str(),
        Value::Object(map) => map.get("_id")?.as_str()?,
        _ => return None,
    };
    (!id.is_empty()).then(|| id.to_string())
}

fn room_key(event: InboundEventName, data: &Value) -> Result<String, ProtocolError> {
    data.as_str()
        .filter(|room| !room.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProtocolError::malformed(event, "expected a non-empty room key"))
}
