//! Directed delivery between sessions
//!
//! The router resolves a target's [`Transport`](parley_core::Transport) under the
//! registry lock, releases the lock, then queues the message. A slow recipient
//! therefore never holds up the registry or the sender.

use std::sync::Arc;

use parley_core::{Message, RoutingError, SessionId, SessionRegistry, TransportError};
use tracing::{debug, warn};

/// Notice sent when the paired session has gone away
pub const PEER_UNAVAILABLE: &str = "The client you were connected to is no longer available.";

/// Routes messages to sessions by ID
#[derive(Clone)]
pub struct Router {
    registry: Arc<SessionRegistry>,
}

impl Router {
    /// Create a router over the given registry
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Queue a message on a session's transport
    pub async fn send_message(&self, id: SessionId, message: Message) -> Result<(), RoutingError> {
        let transport = self
            .registry
            .transport(id)
            .await
            .ok_or(RoutingError::SessionNotFound(id))?;

        transport.deliver(message).map_err(|e| match e {
            TransportError::Saturated => RoutingError::QueueFull(id),
            _ => RoutingError::SessionNotFound(id),
        })
    }

    /// Send a server notice to a session
    pub async fn send_to_session(
        &self,
        id: SessionId,
        content: impl Into<String>,
    ) -> Result<(), RoutingError> {
        self.send_message(id, Message::notice(id, content)).await
    }

    /// Relay `content` from `from` to `target`, then acknowledge to the sender
    ///
    /// A missing target clears the sender's peer and tells the sender; a
    /// saturated target drops this one message and tells the sender. Either
    /// way the error is returned after the sender has been notified.
    pub async fn send_directed(
        &self,
        from: SessionId,
        target: SessionId,
        content: &str,
    ) -> Result<(), RoutingError> {
        let message = Message::directed(from, target, content);

        match self.send_message(target, message).await {
            Ok(()) => {
                debug!(session_id = %from, peer = %target, "Relayed message");
                if let Err(e) = self.send_message(from, Message::delivered(target)).await {
                    warn!(session_id = %from, error = %e, "Failed to acknowledge delivery");
                }
                Ok(())
            }
            Err(RoutingError::SessionNotFound(_)) => {
                self.peer_gone(from).await;
                Err(RoutingError::SessionNotFound(target))
            }
            Err(RoutingError::QueueFull(_)) => {
                warn!(session_id = %from, peer = %target, "Peer queue full, message dropped");
                let notice = format!("Client {target} is not receiving messages right now.");
                if let Err(e) = self.send_to_session(from, notice).await {
                    debug!(session_id = %from, error = %e, "Could not report dropped message");
                }
                Err(RoutingError::QueueFull(target))
            }
            Err(e) => Err(e),
        }
    }

    /// Forward a read receipt for `acknowledged` to its `ReceiverId`
    ///
    /// Clients send `/acknoledgment` with `ReceiverId` set to the author of the
    /// message they received. If that author is gone, the issuing session is
    /// told so and its peer is cleared; the `SenderId` declared in the frame is
    /// not trusted for this.
    pub async fn acknowledge(
        &self,
        issuer: SessionId,
        acknowledged: &Message,
    ) -> Result<(), RoutingError> {
        let Some(author) = SessionId::from_wire(acknowledged.receiver_id) else {
            self.peer_gone(issuer).await;
            return Err(RoutingError::NoRecipient);
        };

        match self.send_message(author, Message::reached(author)).await {
            Err(RoutingError::SessionNotFound(_)) => {
                self.peer_gone(issuer).await;
                Err(RoutingError::SessionNotFound(author))
            }
            other => other,
        }
    }

    /// Clear a session's pairing and tell it the partner left
    async fn peer_gone(&self, id: SessionId) {
        self.registry.set_peer(id, None).await;
        if let Err(e) = self.send_to_session(id, PEER_UNAVAILABLE).await {
            debug!(session_id = %id, error = %e, "Could not report departed peer");
        }
    }
}
