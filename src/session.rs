//! Session struct definition
//!
//! Represents one connected client's server-side record: identity,
//! current room, and presence state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{ConnectionId, RoomName};

/// Server-side record of one connected user
///
/// Owned exclusively by the `ConnectionRegistry`; every other component
/// reads cloned snapshots and never mutates a session directly. Carries no
/// transport channel, so it can be serialized straight into `user_left` /
/// `user_list` events.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Unique identifier for the underlying connection
    pub connection_id: ConnectionId,
    /// Username, set at join and immutable afterward
    pub username: String,
    /// Current room (mutable via room changes)
    pub room: RoomName,
    /// Online flag (flips to false on disconnect, back on reconnect)
    pub online: bool,
    /// Last time presence changed for this session
    pub last_seen: DateTime<Utc>,
}

impl Session {
    /// Create a new online session bound to the given connection
    pub fn new(connection_id: ConnectionId, username: String, room: RoomName) -> Self {
        Self {
            connection_id,
            username,
            room,
            online: true,
            last_seen: Utc::now(),
        }
    }
}
