//! WebSocket connection handler
//!
//! Transport adapter: performs the WebSocket handshake, allocates a
//! connection id, registers the outbound channel with the sink, and pumps
//! events between the socket and the dispatcher. The coordinator itself
//! never sees a socket.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::dispatcher::EventDispatcher;
use crate::error::AppError;
use crate::event::{ClientEvent, ServerEvent};
use crate::sink::{ChannelSink, EventSink};
use crate::types::ConnectionId;

/// Handle a new TCP connection
///
/// Performs WebSocket handshake, sets up bidirectional communication,
/// and manages the connection lifecycle including disconnect notification.
pub async fn handle_connection(
    stream: TcpStream,
    dispatcher: Arc<EventDispatcher>,
    sink: Arc<ChannelSink>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign connection ID and register the outbound channel
    let connection_id = ConnectionId::new();
    info!("Connection {} accepted from {}", connection_id, peer_addr);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    sink.register(connection_id, event_tx);

    // Read task (WebSocket -> dispatcher)
    let dispatcher_read = dispatcher.clone();
    let sink_read = sink.clone();
    let read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => dispatcher_read.handle(connection_id, event).await,
                        Err(e) => {
                            warn!("Invalid JSON from {}: {}", connection_id, e);
                            sink_read.emit(connection_id, AppError::Json(e).into());
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Connection {} sent close frame", connection_id);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // tungstenite replies with a pong on its own
                    debug!("Ping from {}", connection_id);
                }
                Ok(Message::Pong(_)) => {
                    debug!("Pong from {}", connection_id);
                }
                Ok(_) => {
                    // The protocol is text-only; drop binary frames
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", connection_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", connection_id);
    });

    // Write task (ServerEvent -> WebSocket)
    let write_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    // One unserializable event should not take the
                    // connection down with it
                    error!("Failed to serialize event: {}", e);
                }
            }
        }
        debug!("Write task ended for connection");

        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = read_task => {
            debug!("Read task completed for {}", connection_id);
        }
        _ = write_task => {
            debug!("Write task completed for {}", connection_id);
        }
    }

    // Drop the channel and start the disconnect grace period
    sink.unregister(connection_id);
    dispatcher
        .handle_disconnect(connection_id, Some("connection closed"))
        .await;

    info!("Connection {} closed", connection_id);

    Ok(())
}
