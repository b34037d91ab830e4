//! Message record and per-room bounded history
//!
//! `Message` is immutable once created except for its reaction counters.
//! `MessageStore` keeps one bounded FIFO log per room: appends to distinct
//! rooms run in parallel, appends to the same room serialize on that room's
//! lock so history order always matches arrival order.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::session::Session;
use crate::types::{ConnectionId, MessageId, RoomName};

/// Maximum number of messages retained per room (oldest evicted first)
pub const ROOM_HISTORY_CAP: usize = 100;

/// A chat message
///
/// Room messages carry `room: Some(..)` and live in the store; private
/// messages carry both receiver fields, `is_private = true`, and are never
/// stored.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Unique id, assigned at creation, never reused within the process
    pub id: MessageId,
    /// Sender-supplied text (not sanitized at this layer)
    pub text: String,
    pub sender_connection_id: ConnectionId,
    pub sender_username: String,
    /// Room this message was sent to (absent for private messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomName>,
    pub timestamp: DateTime<Utc>,
    /// Anonymous reaction counters: symbol -> count, no per-user attribution
    pub reactions: HashMap<String, u32>,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_connection_id: Option<ConnectionId>,
}

impl Message {
    /// Create a room message from the sender's session
    pub fn room_message(sender: &Session, room: RoomName, text: String) -> Self {
        Self {
            id: MessageId::new(),
            text,
            sender_connection_id: sender.connection_id,
            sender_username: sender.username.clone(),
            room: Some(room),
            timestamp: Utc::now(),
            reactions: HashMap::new(),
            is_private: false,
            receiver_username: None,
            receiver_connection_id: None,
        }
    }

    /// Create a private message between two sessions
    pub fn private_message(sender: &Session, receiver: &Session, text: String) -> Self {
        Self {
            id: MessageId::new(),
            text,
            sender_connection_id: sender.connection_id,
            sender_username: sender.username.clone(),
            room: None,
            timestamp: Utc::now(),
            reactions: HashMap::new(),
            is_private: true,
            receiver_username: Some(receiver.username.clone()),
            receiver_connection_id: Some(receiver.connection_id),
        }
    }

    /// Increment the counter for a reaction symbol (created at 1 if absent)
    pub fn add_reaction(&mut self, symbol: &str) {
        *self.reactions.entry(symbol.to_string()).or_insert(0) += 1;
    }
}

/// Per-room bounded message log
///
/// Outer map is read-locked on the hot path; each room's log has its own
/// lock so concurrent appends to different rooms never contend.
pub struct MessageStore {
    capacity: usize,
    logs: RwLock<HashMap<RoomName, Mutex<VecDeque<Message>>>>,
}

impl MessageStore {
    /// Create a store with the default per-room capacity
    pub fn new() -> Self {
        Self::with_capacity(ROOM_HISTORY_CAP)
    }

    /// Create a store with an explicit per-room capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            logs: RwLock::new(HashMap::new()),
        }
    }

    /// Append a message to a room's log, evicting the oldest entry if the
    /// log exceeds capacity. Returns a clone of the stored message.
    ///
    /// Never fails for valid input; the room's log is created on first use.
    pub async fn append(&self, room: &RoomName, message: Message) -> Message {
        // Fast path: room log already exists
        {
            let logs = self.logs.read().await;
            if let Some(log) = logs.get(room) {
                let mut log = log.lock().await;
                return Self::push_bounded(&mut log, message, self.capacity);
            }
        }

        // First message for this room: create the log under the write lock
        let mut logs = self.logs.write().await;
        let log = logs
            .entry(room.clone())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut log = log.lock().await;
        Self::push_bounded(&mut log, message, self.capacity)
    }

    fn push_bounded(log: &mut VecDeque<Message>, message: Message, capacity: usize) -> Message {
        let stored = message.clone();
        log.push_back(message);
        while log.len() > capacity {
            log.pop_front();
        }
        stored
    }

    /// Snapshot of a room's history, oldest first
    ///
    /// Returns an empty list for rooms with no messages yet.
    pub async fn history(&self, room: &RoomName) -> Vec<Message> {
        let logs = self.logs.read().await;
        match logs.get(room) {
            Some(log) => log.lock().await.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Increment a reaction counter on a message, wherever it lives
    ///
    /// The message id is not room-scoped in the public event, so all room
    /// logs are scanned. Returns the room the message was found in so the
    /// caller can notify it. An unknown id (typically an evicted message) is
    /// a silent no-op: eviction races are expected, not exceptional.
    pub async fn add_reaction(&self, message_id: MessageId, symbol: &str) -> Option<RoomName> {
        let logs = self.logs.read().await;
        for (room, log) in logs.iter() {
            let mut log = log.lock().await;
            if let Some(message) = log.iter_mut().find(|m| m.id == message_id) {
                message.add_reaction(symbol);
                return Some(room.clone());
            }
        }
        debug!("Reaction to unknown or evicted message {}", message_id);
        None
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionId;

    fn test_session(username: &str) -> Session {
        Session::new(ConnectionId::new(), username.to_string(), "general".into())
    }

    fn room_msg(sender: &Session, room: &RoomName, text: &str) -> Message {
        Message::room_message(sender, room.clone(), text.to_string())
    }

    #[tokio::test]
    async fn test_append_and_history_order() {
        let store = MessageStore::new();
        let alice = test_session("alice");
        let room = RoomName::new("general");

        store.append(&room, room_msg(&alice, &room, "first")).await;
        store.append(&room, room_msg(&alice, &room, "second")).await;

        let history = store.history(&room).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "first");
        assert_eq!(history[1].text, "second");
    }

    #[tokio::test]
    async fn test_history_empty_for_unknown_room() {
        let store = MessageStore::new();
        assert!(store.history(&RoomName::new("nowhere")).await.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let store = MessageStore::with_capacity(3);
        let alice = test_session("alice");
        let room = RoomName::new("general");

        for i in 0..4 {
            store
                .append(&room, room_msg(&alice, &room, &format!("msg-{}", i)))
                .await;
        }

        let history = store.history(&room).await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].text, "msg-1");
        assert_eq!(history[2].text, "msg-3");
    }

    #[tokio::test]
    async fn test_full_capacity_keeps_most_recent() {
        let store = MessageStore::new();
        let alice = test_session("alice");
        let room = RoomName::new("general");

        for i in 0..ROOM_HISTORY_CAP + 1 {
            store
                .append(&room, room_msg(&alice, &room, &format!("msg-{}", i)))
                .await;
        }

        let history = store.history(&room).await;
        assert_eq!(history.len(), ROOM_HISTORY_CAP);
        assert_eq!(history[0].text, "msg-1");
        assert_eq!(history[ROOM_HISTORY_CAP - 1].text, format!("msg-{}", ROOM_HISTORY_CAP));
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let store = MessageStore::new();
        let alice = test_session("alice");
        let general = RoomName::new("general");
        let tech = RoomName::new("tech");

        store.append(&general, room_msg(&alice, &general, "hi")).await;
        store.append(&tech, room_msg(&alice, &tech, "rust")).await;

        assert_eq!(store.history(&general).await.len(), 1);
        assert_eq!(store.history(&tech).await.len(), 1);
        assert_eq!(store.history(&tech).await[0].text, "rust");
    }

    #[tokio::test]
    async fn test_add_reaction_increments() {
        let store = MessageStore::new();
        let alice = test_session("alice");
        let room = RoomName::new("general");

        let stored = store.append(&room, room_msg(&alice, &room, "hi")).await;

        // Reactions are anonymous counters: reacting twice counts twice
        assert_eq!(store.add_reaction(stored.id, "👍").await, Some(room.clone()));
        assert_eq!(store.add_reaction(stored.id, "👍").await, Some(room.clone()));

        let history = store.history(&room).await;
        assert_eq!(history[0].reactions.get("👍"), Some(&2));
    }

    #[tokio::test]
    async fn test_add_reaction_unknown_id_is_noop() {
        let store = MessageStore::new();
        let alice = test_session("alice");
        let room = RoomName::new("general");
        store.append(&room, room_msg(&alice, &room, "hi")).await;

        assert_eq!(store.add_reaction(MessageId::new(), "👍").await, None);

        let history = store.history(&room).await;
        assert!(history[0].reactions.is_empty());
    }

    #[tokio::test]
    async fn test_reaction_to_evicted_message_is_noop() {
        let store = MessageStore::with_capacity(1);
        let alice = test_session("alice");
        let room = RoomName::new("general");

        let first = store.append(&room, room_msg(&alice, &room, "old")).await;
        store.append(&room, room_msg(&alice, &room, "new")).await;

        // "old" has been evicted; the reaction disappears without error
        assert_eq!(store.add_reaction(first.id, "🎉").await, None);
    }
}
