//! Multi-Room WebSocket Chat Coordinator Library
//!
//! A chat coordinator built with tokio-tungstenite: tracks which connection
//! belongs to which user and room, fans chat events out to the right subset
//! of connections, and maintains shared ephemeral state (presence, typing
//! indicators, bounded message history, reaction counters).
//!
//! # Features
//! - Session registry with a disconnect grace period and reconnection
//! - Room directory with derived membership and auto-created rooms
//! - Per-room bounded message history (FIFO, 100 messages)
//! - Typing indicators and anonymous reaction counters
//! - Private messages routed to exactly two connections
//!
//! # Architecture
//! Each component guards its own state; there is no coordinator-wide lock:
//! - `ConnectionRegistry` owns all sessions behind one RwLock
//! - `MessageStore` keeps one independently locked log per room
//! - `EventDispatcher` orchestrates the components per inbound event and
//!   emits outbound events through the `EventSink` seam
//! - The WebSocket `handler` adapts sockets to the dispatcher; emission is
//!   a non-blocking handoff so a slow connection never stalls a room
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use chat_relay::{ChannelSink, EventDispatcher, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let sink = Arc::new(ChannelSink::new());
//!     let dispatcher = Arc::new(EventDispatcher::new(sink.clone()));
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(stream, dispatcher.clone(), sink.clone()));
//!     }
//! }
//! ```

pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod handler;
pub mod private;
pub mod registry;
pub mod session;
pub mod sink;
pub mod store;
pub mod typing;
pub mod types;

// Re-export main types for convenience
pub use directory::{RoomChange, RoomDirectory, DEFAULT_ROOMS};
pub use dispatcher::{EventDispatcher, DEFAULT_ROOM, DISCONNECT_GRACE, MAX_USERNAME_LEN};
pub use error::AppError;
pub use event::{ClientEvent, ErrorCode, ServerEvent};
pub use handler::handle_connection;
pub use private::PrivateMessageRouter;
pub use registry::ConnectionRegistry;
pub use session::Session;
pub use sink::{ChannelSink, EventSink};
pub use store::{Message, MessageStore, ROOM_HISTORY_CAP};
pub use typing::{TypingEntry, TypingTracker};
pub use types::{ConnectionId, MessageId, RoomName};
