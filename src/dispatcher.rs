//! EventDispatcher: the coordinator façade
//!
//! The transport calls `handle` for every inbound event; the dispatcher
//! validates it, applies the mutation through the owning component, and
//! emits the outbound events for that transition. Malformed input is
//! rejected locally with an error event to the sender and no state change;
//! events from unregistered connections are dropped as logged no-ops.
//!
//! Concurrency: each component guards its own state, and `send_message`
//! additionally serializes append + fan-out per room so every member
//! observes messages in append order. Disjoint rooms never contend; there
//! is no dispatcher-wide lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::directory::RoomDirectory;
use crate::error::AppError;
use crate::event::{ClientEvent, ServerEvent};
use crate::private::PrivateMessageRouter;
use crate::registry::ConnectionRegistry;
use crate::session::Session;
use crate::sink::EventSink;
use crate::store::{Message, MessageStore};
use crate::typing::TypingTracker;
use crate::types::{ConnectionId, MessageId, RoomName};

/// Room assigned when a join names none
pub const DEFAULT_ROOM: &str = "general";

/// How long a disconnected session survives before it is purged
pub const DISCONNECT_GRACE: Duration = Duration::from_secs(5);

/// Maximum username length in characters
pub const MAX_USERNAME_LEN: usize = 20;

/// Orchestrates every component on each inbound event
pub struct EventDispatcher {
    registry: Arc<ConnectionRegistry>,
    directory: RoomDirectory,
    store: MessageStore,
    typing: TypingTracker,
    router: PrivateMessageRouter,
    sink: Arc<dyn EventSink>,
    grace: Duration,
    /// Per-room sequencing locks for append + fan-out
    send_order: Mutex<HashMap<RoomName, Arc<Mutex<()>>>>,
}

impl EventDispatcher {
    /// Create a dispatcher with default capacity, rooms, and grace period
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_settings(sink, MessageStore::new(), DISCONNECT_GRACE)
    }

    /// Create a dispatcher with an explicit store and grace period
    pub fn with_settings(sink: Arc<dyn EventSink>, store: MessageStore, grace: Duration) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            directory: RoomDirectory::new(registry.clone()),
            router: PrivateMessageRouter::new(registry.clone()),
            registry,
            store,
            typing: TypingTracker::new(),
            sink,
            grace,
            send_order: Mutex::new(HashMap::new()),
        }
    }

    /// Process one inbound event from a connection
    pub async fn handle(&self, connection_id: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::Join { username, room } => {
                let room = room.unwrap_or_else(|| RoomName::new(DEFAULT_ROOM));
                self.handle_join(connection_id, username, room).await;
            }
            ClientEvent::ChangeRoom { room } => {
                self.handle_change_room(connection_id, room).await;
            }
            ClientEvent::SendMessage { text, room } => {
                self.handle_send_message(connection_id, text, room).await;
            }
            ClientEvent::SetTyping { is_typing, room } => {
                self.handle_set_typing(connection_id, is_typing, room).await;
            }
            ClientEvent::PrivateMessage { to, text } => {
                self.handle_private_message(connection_id, to, text).await;
            }
            ClientEvent::Reaction { message_id, symbol } => {
                self.handle_reaction(connection_id, message_id, symbol).await;
            }
            ClientEvent::Disconnect { reason } => {
                self.handle_disconnect(connection_id, reason.as_deref()).await;
            }
            ClientEvent::Reconnect => {
                self.handle_reconnect(connection_id).await;
            }
        }
    }

    /// Handle a join: register the session and bring the client up to date
    async fn handle_join(&self, connection_id: ConnectionId, username: String, room: RoomName) {
        let username = username.trim().to_string();
        if let Err(err) = validate_username(&username) {
            self.sink.emit(connection_id, err.into());
            return;
        }

        let session = match self.registry.register(connection_id, username, room.clone()).await {
            Ok(session) => session,
            Err(err) => {
                warn!("Join rejected for {}: {}", connection_id, err);
                self.sink.emit(connection_id, err.into());
                return;
            }
        };
        self.directory.ensure_room(&room).await;

        info!("'{}' joined room '{}'", session.username, room);

        // Self: room list, confirmation, history snapshot
        let rooms = self.directory.list_rooms().await;
        self.sink.emit(connection_id, ServerEvent::RoomList { rooms });
        self.sink
            .emit(connection_id, ServerEvent::RoomJoined { room: room.clone() });
        let messages = self.store.history(&room).await;
        self.sink
            .emit(connection_id, ServerEvent::RoomHistory { messages });

        // Rest of room: user joined; whole room: fresh user list
        self.broadcast_room(
            &room,
            ServerEvent::UserJoined {
                username: session.username.clone(),
                connection_id,
            },
            Some(connection_id),
        )
        .await;
        self.broadcast_user_list(&room).await;
    }

    /// Handle a room change as one leave-then-join transition
    async fn handle_change_room(&self, connection_id: ConnectionId, room: RoomName) {
        let change = match self.directory.change_room(connection_id, room).await {
            Ok(change) => change,
            Err(err) => {
                debug!("Dropping room change from {}: {}", connection_id, err);
                return;
            }
        };
        let Some(session) = self.registry.get(connection_id).await else {
            return;
        };

        info!(
            "'{}' moved from '{}' to '{}'",
            session.username, change.previous, change.target
        );

        // Previous room: user left + updated list
        self.broadcast_room(
            &change.previous,
            ServerEvent::UserLeft { user: session.clone() },
            Some(connection_id),
        )
        .await;
        self.broadcast_user_list(&change.previous).await;

        // New room: user joined + updated list
        self.broadcast_room(
            &change.target,
            ServerEvent::UserJoined {
                username: session.username.clone(),
                connection_id,
            },
            Some(connection_id),
        )
        .await;
        self.broadcast_user_list(&change.target).await;

        // Self: confirmation + history of the new room
        self.sink.emit(
            connection_id,
            ServerEvent::RoomJoined { room: change.target.clone() },
        );
        let messages = self.store.history(&change.target).await;
        self.sink
            .emit(connection_id, ServerEvent::RoomHistory { messages });
    }

    /// Handle a room message: append, fan out to the room, ack the sender
    async fn handle_send_message(
        &self,
        connection_id: ConnectionId,
        text: String,
        room: Option<RoomName>,
    ) {
        let Some(session) = self.registry.get(connection_id).await else {
            debug!("Dropping message from unregistered {}", connection_id);
            return;
        };
        if text.trim().is_empty() {
            self.sink.emit(connection_id, AppError::EmptyMessage.into());
            return;
        }

        let room = room.unwrap_or_else(|| session.room.clone());
        self.directory.ensure_room(&room).await;

        // Append and fan-out are one step per room, so every member observes
        // messages in append order
        let sequencer = self.room_sequencer(&room).await;
        let _guard = sequencer.lock().await;

        let message = Message::room_message(&session, room.clone(), text);
        let stored = self.store.append(&room, message).await;

        self.broadcast_room(&room, ServerEvent::Message { message: stored.clone() }, None)
            .await;
        self.sink.emit(
            connection_id,
            ServerEvent::MessageDelivered { message_id: stored.id },
        );
    }

    /// Handle a typing indicator change and refresh the room's typing list
    async fn handle_set_typing(
        &self,
        connection_id: ConnectionId,
        is_typing: bool,
        room: Option<RoomName>,
    ) {
        let Some(session) = self.registry.get(connection_id).await else {
            debug!("Dropping typing event from unregistered {}", connection_id);
            return;
        };
        // An offline session must never appear in a typing list, so events
        // arriving between disconnect and reconnect are dropped.
        if !session.online {
            debug!("Dropping typing event from offline {}", connection_id);
            return;
        }
        let room = room.unwrap_or_else(|| session.room.clone());

        self.typing
            .set_typing(connection_id, session.username, room.clone(), is_typing)
            .await;

        let usernames = self.typing.typing_usernames(&room).await;
        self.broadcast_room(
            &room,
            ServerEvent::TypingUsers { room: room.clone(), usernames },
            None,
        )
        .await;
    }

    /// Handle a private message: deliver to recipient and sender only
    async fn handle_private_message(
        &self,
        connection_id: ConnectionId,
        to: ConnectionId,
        text: String,
    ) {
        match self.router.route(connection_id, to, text).await {
            Ok(message) => {
                self.sink
                    .emit(to, ServerEvent::PrivateMessage { message: message.clone() });
                self.sink
                    .emit(connection_id, ServerEvent::PrivateMessage { message });
            }
            Err(err) => {
                debug!("Private message from {} failed: {}", connection_id, err);
                self.sink.emit(connection_id, err.into());
            }
        }
    }

    /// Handle a reaction: increment and notify the message's room
    ///
    /// An unknown id (usually an evicted message) is a silent no-op.
    async fn handle_reaction(
        &self,
        connection_id: ConnectionId,
        message_id: MessageId,
        symbol: String,
    ) {
        match self.store.add_reaction(message_id, &symbol).await {
            Some(room) => {
                self.broadcast_room(
                    &room,
                    ServerEvent::ReactionUpdate { message_id, symbol },
                    None,
                )
                .await;
            }
            None => {
                debug!(
                    "Dropping reaction from {} to unknown message {}",
                    connection_id, message_id
                );
            }
        }
    }

    /// Handle a disconnect: mark offline, clear typing, schedule the purge
    ///
    /// The session survives for the grace period so the connection can
    /// resume; `purge_if_still_offline` is a no-op if it did.
    pub async fn handle_disconnect(&self, connection_id: ConnectionId, reason: Option<&str>) {
        let Some(session) = self.registry.mark_offline(connection_id).await else {
            debug!("Disconnect for unknown or already offline {}", connection_id);
            return;
        };

        info!(
            "'{}' disconnected ({})",
            session.username,
            reason.unwrap_or("connection closed")
        );

        self.typing.clear(connection_id).await;

        self.broadcast_room(
            &session.room,
            ServerEvent::UserLeft { user: session.clone() },
            Some(connection_id),
        )
        .await;
        self.broadcast_user_list(&session.room).await;

        // Purge after the grace delay unless the session came back online
        let registry = self.registry.clone();
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if registry.purge_if_still_offline(connection_id).await {
                debug!("Session for {} purged after grace period", connection_id);
            }
        });
    }

    /// Handle a reconnect within the grace window
    pub async fn handle_reconnect(&self, connection_id: ConnectionId) {
        let Some(session) = self.registry.mark_online(connection_id).await else {
            debug!("Reconnect for unknown or already online {}", connection_id);
            return;
        };

        info!("'{}' reconnected to '{}'", session.username, session.room);

        self.broadcast_room(
            &session.room,
            ServerEvent::UserJoined {
                username: session.username.clone(),
                connection_id,
            },
            Some(connection_id),
        )
        .await;
        self.broadcast_user_list(&session.room).await;
    }

    // ---- read-only snapshot queries ----

    /// Point-in-time history snapshot for a room, oldest first
    pub async fn history(&self, room: &RoomName) -> Vec<Message> {
        self.store.history(room).await
    }

    /// Point-in-time user list for a room
    pub async fn users_in_room(&self, room: &RoomName) -> Vec<Session> {
        self.directory.users_in_room(room).await
    }

    /// Known room names
    pub async fn rooms(&self) -> Vec<RoomName> {
        self.directory.list_rooms().await
    }

    // ---- emission helpers ----

    /// Emit one event to every member of a room, optionally excluding one
    async fn broadcast_room(
        &self,
        room: &RoomName,
        event: ServerEvent,
        exclude: Option<ConnectionId>,
    ) {
        for member in self.registry.list_by_room(room).await {
            if Some(member.connection_id) == exclude {
                continue;
            }
            self.sink.emit(member.connection_id, event.clone());
        }
    }

    /// Emit the current user list to every member of a room
    async fn broadcast_user_list(&self, room: &RoomName) {
        let users = self.directory.users_in_room(room).await;
        self.broadcast_room(room, ServerEvent::UserList { users }, None).await;
    }

    /// The sequencing lock for a room (created on first use)
    async fn room_sequencer(&self, room: &RoomName) -> Arc<Mutex<()>> {
        let mut locks = self.send_order.lock().await;
        locks
            .entry(room.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Validate a username at the boundary: 1 to `MAX_USERNAME_LEN` characters
fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() {
        return Err(AppError::InvalidUsername("must not be empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::InvalidUsername(format!(
            "must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    Ok(())
}
