//! Event protocol definitions
//!
//! JSON-based bidirectional event protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. This is the typed boundary
//! replacing loose key-value payloads: every inbound event is validated
//! into a variant before it reaches the coordinator.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::session::Session;
use crate::store::Message;
use crate::types::{ConnectionId, MessageId, RoomName};

/// Client → Server event
///
/// All events from client to server. Uses tagged enum with snake_case naming.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join the chat with a username (room defaults to "general")
    Join {
        username: String,
        #[serde(default)]
        room: Option<RoomName>,
    },
    /// Switch to another room
    ChangeRoom { room: RoomName },
    /// Send a chat message (room defaults to the session's current room)
    SendMessage {
        text: String,
        #[serde(default)]
        room: Option<RoomName>,
    },
    /// Start or stop the typing indicator
    SetTyping {
        is_typing: bool,
        #[serde(default)]
        room: Option<RoomName>,
    },
    /// Send a private message to one connection
    PrivateMessage {
        to: ConnectionId,
        text: String,
    },
    /// React to a message by id
    Reaction {
        message_id: MessageId,
        symbol: String,
    },
    /// Explicitly drop the session (grace period applies before purge)
    Disconnect {
        #[serde(default)]
        reason: Option<String>,
    },
    /// Resume a session within the grace window
    Reconnect,
}

/// Server → Client event
///
/// All events from server to client. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Known room names, in directory order
    RoomList { rooms: Vec<RoomName> },
    /// Confirmation that the client is now in this room
    RoomJoined { room: RoomName },
    /// Snapshot of the room's message history, oldest first
    RoomHistory { messages: Vec<Message> },
    /// Another user joined the room
    UserJoined {
        username: String,
        connection_id: ConnectionId,
    },
    /// A user left the room (or disconnected)
    UserLeft { user: Session },
    /// Current users in the room
    UserList { users: Vec<Session> },
    /// New room message
    Message { message: Message },
    /// Delivery acknowledgment for the sender
    MessageDelivered { message_id: MessageId },
    /// Usernames currently typing in a room
    TypingUsers {
        room: RoomName,
        usernames: Vec<String>,
    },
    /// Private message, delivered to sender and recipient only
    PrivateMessage { message: Message },
    /// A reaction counter changed on a message
    ReactionUpdate {
        message_id: MessageId,
        symbol: String,
    },
    /// Error occurred (sent to the offending connection only)
    Error { code: ErrorCode, message: String },
}

/// Error codes for ServerEvent::Error
///
/// Represents different error scenarios that can be communicated to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Connection already has a registered session
    DuplicateConnection,
    /// Event arrived from an unregistered connection
    UnknownSession,
    /// Private message target not found
    UnknownRecipient,
    /// Username empty or over the length limit
    InvalidUsername,
    /// Message text empty after trimming
    EmptyMessage,
    /// Invalid event format
    InvalidEvent,
}

/// Convert AppError to ServerEvent for client notification
impl From<AppError> for ServerEvent {
    fn from(err: AppError) -> Self {
        let (code, message) = match &err {
            AppError::DuplicateConnection(_) => (
                ErrorCode::DuplicateConnection,
                "Connection is already registered".to_string(),
            ),
            AppError::UnknownSession(_) | AppError::UnknownSender(_) => (
                ErrorCode::UnknownSession,
                "No session for this connection".to_string(),
            ),
            AppError::UnknownRecipient(id) => (
                ErrorCode::UnknownRecipient,
                format!("Recipient '{}' not found", id),
            ),
            AppError::InvalidUsername(reason) => {
                (ErrorCode::InvalidUsername, format!("Invalid username: {}", reason))
            }
            AppError::EmptyMessage => {
                (ErrorCode::EmptyMessage, "Message text is empty".to_string())
            }
            AppError::Json(e) => {
                (ErrorCode::InvalidEvent, format!("Invalid event format: {}", e))
            }
            // Fatal errors are not typically converted (connection closes)
            _ => (ErrorCode::InvalidEvent, "Internal error".to_string()),
        };
        ServerEvent::Error { code, message }
    }
}
