//! Session entity and its transport handle
//!
//! A Session is created when a connection is accepted and lives in the
//! [`SessionRegistry`](super::SessionRegistry) until the connection ends or the
//! liveness sweep evicts it. Fields are only mutated through the registry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::protocol::Message;

/// Identifier of a connected session
///
/// Assigned sequentially from 1; 0 is reserved for the server on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Parse an ID taken from a wire message; non-positive values name no session
    pub fn from_wire(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().filter(|id| *id > 0).map(Self)
    }

    /// The ID as it appears in wire messages
    pub fn as_wire(self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Not talking to anyone; chat content is rejected
    Idle,
    /// Chat content is relayed to the given session
    Paired(SessionId),
}

/// Handle to a session's connection
///
/// Outbound messages are queued to the connection's writer task rather than
/// written directly, so delivering never blocks on a slow socket. Closing
/// cancels the connection's token, which stops both its reader and writer.
#[derive(Debug, Clone)]
pub struct Transport {
    outbox: mpsc::Sender<Message>,
    closer: CancellationToken,
}

impl Transport {
    /// Wrap an existing outbound queue
    pub fn new(outbox: mpsc::Sender<Message>, closer: CancellationToken) -> Self {
        Self { outbox, closer }
    }

    /// Create a transport with a bounded outbound queue, returning the queue's receiving end
    pub fn channel(capacity: usize, closer: CancellationToken) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx, closer), rx)
    }

    /// Queue a message for the writer without waiting
    pub fn deliver(&self, message: Message) -> Result<(), TransportError> {
        if self.closer.is_cancelled() {
            return Err(TransportError::Closed);
        }
        self.outbox.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Saturated,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    /// Close the connection
    pub fn close(&self) {
        self.closer.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closer.is_cancelled() || self.outbox.is_closed()
    }

    /// Token cancelled when this transport is closed
    pub fn closer(&self) -> &CancellationToken {
        &self.closer
    }
}

/// Server-side record of one connected client
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    display_name: Option<String>,
    transport: Transport,
    last_activity: Instant,
    peer: Option<SessionId>,
    connected_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(id: SessionId, transport: Transport) -> Self {
        Self {
            id,
            display_name: None,
            transport,
            last_activity: Instant::now(),
            peer: None,
            connected_at: Utc::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn peer(&self) -> Option<SessionId> {
        self.peer
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn state(&self) -> ConversationState {
        match self.peer {
            Some(peer) => ConversationState::Paired(peer),
            None => ConversationState::Idle,
        }
    }

    /// Whether no frame has arrived within `timeout` of `now`
    pub fn is_idle_beyond(&self, now: Instant, timeout: std::time::Duration) -> bool {
        now.saturating_duration_since(self.last_activity) > timeout
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub(crate) fn set_peer(&mut self, peer: Option<SessionId>) {
        self.peer = peer;
    }

    pub(crate) fn set_display_name(&mut self, name: Option<String>) {
        self.display_name = name;
    }
}
