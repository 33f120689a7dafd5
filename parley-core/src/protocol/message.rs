//! Wire message carried by every frame

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::session::SessionId;

/// Sender ID reserved for server-originated messages
pub const SERVER_SENDER_ID: i64 = 0;

/// Conversation ID of the notice that tells a client its assigned ID
pub const ID_ASSIGNMENT_CONVERSATION: i64 = -1;

/// Conversation ID of server notices that belong to no conversation
pub const NOTICE_CONVERSATION: i64 = 0;

/// One application message, serialized as a single JSON object per frame.
///
/// Field names follow the PascalCase wire contract shared with existing clients.
/// Integer fields and the timestamp default when a client omits them; `Content`
/// is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(default)]
    pub sender_id: i64,
    #[serde(default)]
    pub receiver_id: i64,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub conversation_id: i64,
}

impl Message {
    /// Decode a frame body
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(frame)?)
    }

    /// A message relayed from one session to its peer
    pub fn directed(from: SessionId, to: SessionId, content: impl Into<String>) -> Self {
        Self {
            sender_id: from.as_wire(),
            receiver_id: to.as_wire(),
            content: content.into(),
            timestamp: now_iso8601(),
            conversation_id: to.as_wire(),
        }
    }

    /// A frame written by a client; `receiver_id` is 0 when no peer is known
    pub fn outgoing(sender: SessionId, receiver_id: i64, content: impl Into<String>) -> Self {
        Self {
            sender_id: sender.as_wire(),
            receiver_id,
            content: content.into(),
            timestamp: now_iso8601(),
            conversation_id: NOTICE_CONVERSATION,
        }
    }

    /// A server notice addressed to `to`, outside any conversation
    pub fn notice(to: SessionId, content: impl Into<String>) -> Self {
        Self::from_server(to.as_wire(), content, NOTICE_CONVERSATION)
    }

    /// The first frame a client receives, carrying its assigned ID
    pub fn id_assignment(id: SessionId) -> Self {
        Self::from_server(
            id.as_wire(),
            format!("Your assigned client ID is {id}."),
            ID_ASSIGNMENT_CONVERSATION,
        )
    }

    /// Confirmation to a sender that its message was handed to `target`
    pub fn delivered(target: SessionId) -> Self {
        Self::from_server(target.as_wire(), "Message delivered.", target.as_wire())
    }

    /// Read receipt forwarded to the original author of a message
    pub fn reached(target: SessionId) -> Self {
        Self::from_server(target.as_wire(), "Message Reached!.", target.as_wire())
    }

    fn from_server(receiver_id: i64, content: impl Into<String>, conversation_id: i64) -> Self {
        Self {
            sender_id: SERVER_SENDER_ID,
            receiver_id,
            content: content.into(),
            timestamp: now_iso8601(),
            conversation_id,
        }
    }

    /// Whether this message originated from the server
    pub fn is_from_server(&self) -> bool {
        self.sender_id == SERVER_SENDER_ID
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
