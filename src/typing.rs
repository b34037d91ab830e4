//! TypingTracker: ephemeral per-room typing indicators
//!
//! One entry per connection, keyed the way the presence map is: an entry
//! says "this connection is typing in this room". Entries are removed by an
//! explicit stop event or by `clear` on disconnect; there is no server-side
//! timeout.

use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;

use crate::types::{ConnectionId, RoomName};

/// One connection currently typing in one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingEntry {
    pub username: String,
    pub room: RoomName,
}

/// Tracks which connections are typing in which room
pub struct TypingTracker {
    entries: RwLock<HashMap<ConnectionId, TypingEntry>>,
}

impl TypingTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or remove the typing entry for a connection
    pub async fn set_typing(
        &self,
        connection_id: ConnectionId,
        username: String,
        room: RoomName,
        is_typing: bool,
    ) {
        let mut entries = self.entries.write().await;
        if is_typing {
            entries.insert(connection_id, TypingEntry { username, room });
        } else {
            entries.remove(&connection_id);
        }
    }

    /// Usernames currently typing in a room, deduplicated and sorted
    ///
    /// Two connections sharing a username collapse into one entry; that is
    /// accepted behavior for the indicator.
    pub async fn typing_usernames(&self, room: &RoomName) -> Vec<String> {
        let entries = self.entries.read().await;
        let names: BTreeSet<&str> = entries
            .values()
            .filter(|e| &e.room == room)
            .map(|e| e.username.as_str())
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Remove any entry for this connection, regardless of room
    ///
    /// Called on disconnect; returns the removed entry so the caller knows
    /// which room's indicator changed.
    pub async fn clear(&self, connection_id: ConnectionId) -> Option<TypingEntry> {
        self.entries.write().await.remove(&connection_id)
    }
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new()
    }
}
