//! PrivateMessageRouter: one-to-one message routing
//!
//! Stateless: resolves both ends through the registry and builds the
//! message. Private messages never enter the room history; the caller
//! delivers the result to exactly two destinations, the recipient and the
//! sender's own connection.

use std::sync::Arc;

use crate::error::AppError;
use crate::registry::ConnectionRegistry;
use crate::store::Message;
use crate::types::ConnectionId;

/// Routes a message between two specific sessions
pub struct PrivateMessageRouter {
    registry: Arc<ConnectionRegistry>,
}

impl PrivateMessageRouter {
    /// Create a router reading identities from the given registry
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Build a private message from sender to recipient
    ///
    /// Fails with `UnknownSender` / `UnknownRecipient` if either lookup
    /// fails; the caller surfaces that to the sender as a local error event
    /// rather than dropping silently.
    pub async fn route(
        &self,
        from: ConnectionId,
        to: ConnectionId,
        text: String,
    ) -> Result<Message, AppError> {
        let sender = self
            .registry
            .get(from)
            .await
            .ok_or(AppError::UnknownSender(from))?;
        let receiver = self
            .registry
            .get(to)
            .await
            .ok_or(AppError::UnknownRecipient(to))?;

        Ok(Message::private_message(&sender, &receiver, text))
    }
}
