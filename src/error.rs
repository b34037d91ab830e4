//! Error types for the chat coordinator
//!
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::ConnectionId;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// recoverable errors (send error event to the offending client).
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection is already registered
    #[error("Connection {0} is already registered")]
    DuplicateConnection(ConnectionId),

    /// Event from a connection with no registered session
    #[error("No session for connection {0}")]
    UnknownSession(ConnectionId),

    /// Private message sender has no registered session
    #[error("Unknown sender {0}")]
    UnknownSender(ConnectionId),

    /// Private message recipient has no registered session
    #[error("Unknown recipient {0}")]
    UnknownRecipient(ConnectionId),

    /// Username is empty or exceeds the length limit
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Message text is empty after trimming
    #[error("Empty message")]
    EmptyMessage,
}
