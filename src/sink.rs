//! Event emission seam between the coordinator and the transport
//!
//! The dispatcher never talks to sockets: it emits `ServerEvent`s through an
//! `EventSink`. The production implementation hands events to per-connection
//! unbounded channels, so emission never blocks state mutation no matter how
//! slow a receiving connection is. Tests substitute a recording sink.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc;
use tracing::warn;

use crate::event::ServerEvent;
use crate::types::ConnectionId;

/// Outbound event destination
///
/// Implementations must not block: `emit` is called while the dispatcher is
/// mid-transition and a stalled receiver must never stall the room.
pub trait EventSink: Send + Sync {
    /// Deliver one event to one connection (best effort)
    fn emit(&self, connection_id: ConnectionId, event: ServerEvent);
}

/// Channel-backed sink used by the WebSocket transport
///
/// Each connection registers an unbounded sender on accept; the write task
/// on the other end serializes events onto the socket.
pub struct ChannelSink {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl ChannelSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection's outbound channel
    pub fn register(&self, connection_id: ConnectionId, sender: mpsc::UnboundedSender<ServerEvent>) {
        self.write_guard().insert(connection_id, sender);
    }

    /// Drop a connection's outbound channel (on socket close)
    pub fn unregister(&self, connection_id: ConnectionId) {
        self.write_guard().remove(&connection_id);
    }

    fn write_guard(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>
    {
        // A poisoned lock only means a panic elsewhere; the map is still valid
        self.senders.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, connection_id: ConnectionId, event: ServerEvent) {
        let senders = self.senders.read().unwrap_or_else(|e| e.into_inner());
        if let Some(sender) = senders.get(&connection_id) {
            if sender.send(event).is_err() {
                warn!("Dropping event for {}: channel closed", connection_id);
            }
        }
    }
}

impl Default for ChannelSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_registered_connection() {
        let sink = ChannelSink::new();
        let conn = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        sink.register(conn, tx);

        sink.emit(conn, ServerEvent::RoomJoined { room: "general".into() });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ServerEvent::RoomJoined { .. }));
    }

    #[tokio::test]
    async fn test_emit_to_unknown_connection_is_noop() {
        let sink = ChannelSink::new();
        // No panic, no error
        sink.emit(ConnectionId::new(), ServerEvent::RoomJoined { room: "general".into() });
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let sink = ChannelSink::new();
        let conn = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        sink.register(conn, tx);
        sink.unregister(conn);

        sink.emit(conn, ServerEvent::RoomJoined { room: "general".into() });
        assert!(rx.try_recv().is_err());
    }
}
