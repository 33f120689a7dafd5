//! Per-session command interpretation
//!
//! A session is either Idle (no peer) or Paired (peer set). Commands move it
//! between the two; chat content is relayed only while Paired. Every frame
//! that decodes refreshes the activity clock before it is interpreted.

use std::sync::Arc;

use parley_core::{Command, Message, ProtocolError, RoutingError, SessionId, SessionRegistry};
use tracing::{debug, trace};

use crate::router::Router;
use crate::state::AppState;

/// Reply to `/connect` naming an unknown session
pub const CLIENT_NOT_FOUND: &str = "Client not found.";
/// Reply to `/exit`
pub const EXITED: &str = "Exited conversation. You can start a new one with /connect <client_id>.";
/// Reply to chat content sent while Idle
pub const NOT_PAIRED: &str =
    "You must start a conversation with /connect <client_id> before sending messages.";

/// Interprets the frames of one session
pub struct CommandDispatcher {
    session_id: SessionId,
    registry: Arc<SessionRegistry>,
    router: Router,
}

impl CommandDispatcher {
    /// Create a dispatcher bound to `session_id`
    pub fn new(session_id: SessionId, state: &AppState) -> Self {
        Self {
            session_id,
            registry: Arc::clone(&state.registry),
            router: state.router.clone(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Decode one frame body and execute it
    ///
    /// A body that is not a valid message is returned as an error without
    /// touching the activity clock.
    pub async fn handle_frame(&self, frame: &str) -> Result<(), ProtocolError> {
        let message = Message::decode(frame)?;
        self.registry.touch(self.session_id).await;
        self.dispatch(message).await;
        Ok(())
    }

    /// Execute a decoded message
    pub async fn dispatch(&self, message: Message) {
        let command = match Command::parse(&message.content) {
            Ok(command) => command,
            Err(e) => {
                debug!(session_id = %self.session_id, error = %e, "Rejected command");
                self.reply(e.to_string()).await;
                return;
            }
        };

        let result = match command {
            Command::Heartbeat => {
                trace!(session_id = %self.session_id, "Heartbeat");
                Ok(())
            }
            Command::List => self.list().await,
            Command::Connect(target) => self.connect(target).await,
            Command::Exit => self.exit().await,
            Command::Acknowledge => self.router.acknowledge(self.session_id, &message).await,
            Command::Chat(content) => self.chat(content).await,
        };

        if let Err(e) = result {
            debug!(session_id = %self.session_id, error = %e, "Command not completed");
        }
    }

    /// Send a server notice to this session
    pub async fn reply(&self, content: impl Into<String>) {
        if let Err(e) = self.router.send_to_session(self.session_id, content).await {
            debug!(session_id = %self.session_id, error = %e, "Reply not delivered");
        }
    }

    async fn list(&self) -> Result<(), RoutingError> {
        let mut listing = String::from("Active clients:\n");
        for session in self.registry.snapshot().await {
            if session.id() == self.session_id {
                continue;
            }
            let name = session.display_name().unwrap_or("Anonymous");
            listing.push_str(&format!("ID: {}, Name: {}\n", session.id(), name));
        }
        self.router.send_to_session(self.session_id, listing).await
    }

    async fn connect(&self, target: SessionId) -> Result<(), RoutingError> {
        match self.registry.connect(self.session_id, target).await {
            Ok(()) => {
                debug!(session_id = %self.session_id, peer = %target, "Paired");
                self.router
                    .send_to_session(
                        self.session_id,
                        format!("You are now connected to Client {target}. Type your messages."),
                    )
                    .await
            }
            Err(RoutingError::SessionNotFound(missing)) if missing == target => {
                self.router
                    .send_to_session(self.session_id, CLIENT_NOT_FOUND)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn exit(&self) -> Result<(), RoutingError> {
        self.registry.set_peer(self.session_id, None).await;
        debug!(session_id = %self.session_id, "Left conversation");
        self.router.send_to_session(self.session_id, EXITED).await
    }

    async fn chat(&self, content: &str) -> Result<(), RoutingError> {
        match self.registry.peer_of(self.session_id).await {
            Some(peer) => {
                debug!(session_id = %self.session_id, peer = %peer, content, "Received message");
                self.router
                    .send_directed(self.session_id, peer, content)
                    .await
            }
            None => self.router.send_to_session(self.session_id, NOT_PAIRED).await,
        }
    }
}
