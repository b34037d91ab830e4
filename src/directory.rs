//! RoomDirectory: room names and derived membership
//!
//! Holds the ordered set of known room names and answers membership queries
//! by reading the registry live, so a user list always reflects the most
//! recent room change. Room creation policy: the directory is seeded with a
//! configured list and any unknown room a client names is registered on
//! first use, in first-use order.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::error::AppError;
use crate::registry::ConnectionRegistry;
use crate::session::Session;
use crate::types::{ConnectionId, RoomName};

/// Rooms every coordinator starts with
pub const DEFAULT_ROOMS: [&str; 3] = ["general", "random", "tech"];

/// The result of a room change: both sides of the transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomChange {
    pub previous: RoomName,
    pub target: RoomName,
}

/// Directory of known rooms with live membership views
pub struct RoomDirectory {
    registry: Arc<ConnectionRegistry>,
    rooms: RwLock<Vec<RoomName>>,
}

impl RoomDirectory {
    /// Create a directory seeded with the default room list
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self::with_rooms(registry, DEFAULT_ROOMS.iter().map(|r| RoomName::new(*r)))
    }

    /// Create a directory with an explicit seed list
    pub fn with_rooms(
        registry: Arc<ConnectionRegistry>,
        rooms: impl IntoIterator<Item = RoomName>,
    ) -> Self {
        Self {
            registry,
            rooms: RwLock::new(rooms.into_iter().collect()),
        }
    }

    /// Sessions currently assigned to a room
    ///
    /// Derived live from the registry: reflects the latest `set_room` /
    /// `mark_offline` with no staleness window.
    pub async fn users_in_room(&self, room: &RoomName) -> Vec<Session> {
        self.registry.list_by_room(room).await
    }

    /// Move a connection to another room as one logical transition
    ///
    /// Returns both room names so the caller can notify the room that was
    /// left and the room that was joined. Registers the target room if it is
    /// new.
    pub async fn change_room(
        &self,
        connection_id: ConnectionId,
        target: RoomName,
    ) -> Result<RoomChange, AppError> {
        self.ensure_room(&target).await;
        let previous = self.registry.set_room(connection_id, target.clone()).await?;
        Ok(RoomChange { previous, target })
    }

    /// Known room names, seed order first, then first-use order
    pub async fn list_rooms(&self) -> Vec<RoomName> {
        self.rooms.read().await.clone()
    }

    /// Register a room name if it is not already known
    pub async fn ensure_room(&self, room: &RoomName) {
        {
            let rooms = self.rooms.read().await;
            if rooms.contains(room) {
                return;
            }
        }
        let mut rooms = self.rooms.write().await;
        if !rooms.contains(room) {
            info!("Registering new room '{}'", room);
            rooms.push(room.clone());
        }
    }
}
