//! ConnectionRegistry: session ownership and presence
//!
//! Maps each live connection to its session. All session state lives behind
//! one RwLock, so room-membership reads are linearizable with respect to
//! `set_room` / `mark_offline` writes. The registry never emits events;
//! callers emit after a mutation succeeds.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::AppError;
use crate::session::Session;
use crate::types::{ConnectionId, RoomName};

/// Owns every `Session` in the process
///
/// Sessions are created on join, flipped offline on disconnect, and deleted
/// by `purge_if_still_offline` after the grace delay unless the connection
/// came back in the meantime.
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<ConnectionId, Session>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new session bound to the given connection
    ///
    /// Fails with `DuplicateConnection` if the connection already has one.
    pub async fn register(
        &self,
        connection_id: ConnectionId,
        username: String,
        room: RoomName,
    ) -> Result<Session, AppError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&connection_id) {
            return Err(AppError::DuplicateConnection(connection_id));
        }
        let session = Session::new(connection_id, username, room);
        sessions.insert(connection_id, session.clone());
        info!("Registered session '{}' for {}", session.username, connection_id);
        Ok(session)
    }

    /// Look up a session snapshot by connection
    pub async fn get(&self, connection_id: ConnectionId) -> Option<Session> {
        self.sessions.read().await.get(&connection_id).cloned()
    }

    /// Atomically move a session to a new room
    ///
    /// Returns the previous room so the caller can notify both sides of the
    /// transition. No concurrent `list_by_room` read can observe the session
    /// in neither or both rooms.
    pub async fn set_room(
        &self,
        connection_id: ConnectionId,
        new_room: RoomName,
    ) -> Result<RoomName, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&connection_id)
            .ok_or(AppError::UnknownSession(connection_id))?;
        let previous = std::mem::replace(&mut session.room, new_room);
        Ok(previous)
    }

    /// Flip a session offline without deleting it (supports reconnection)
    ///
    /// Returns the updated session on the online → offline transition, None
    /// if the session is missing or already offline.
    pub async fn mark_offline(&self, connection_id: ConnectionId) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&connection_id)?;
        if !session.online {
            return None;
        }
        session.online = false;
        session.last_seen = Utc::now();
        Some(session.clone())
    }

    /// Flip a session back online (cancels a pending purge)
    ///
    /// Returns the updated session on the offline → online transition, None
    /// if the session is missing or already online.
    pub async fn mark_online(&self, connection_id: ConnectionId) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&connection_id)?;
        if session.online {
            return None;
        }
        session.online = true;
        session.last_seen = Utc::now();
        Some(session.clone())
    }

    /// Delete a session only if it is still offline
    ///
    /// Intended to run after the disconnect grace delay; a reconnection that
    /// marked the session online before this fires wins, and the session is
    /// kept. Returns true if the session was deleted.
    pub async fn purge_if_still_offline(&self, connection_id: ConnectionId) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&connection_id) {
            Some(session) if !session.online => {
                sessions.remove(&connection_id);
                debug!("Purged offline session for {}", connection_id);
                true
            }
            _ => false,
        }
    }

    /// All sessions currently assigned to a room, sorted by username
    pub async fn list_by_room(&self, room: &RoomName) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        let mut in_room: Vec<Session> = sessions
            .values()
            .filter(|s| &s.room == room)
            .cloned()
            .collect();
        in_room.sort_by(|a, b| a.username.cmp(&b.username));
        in_room
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
