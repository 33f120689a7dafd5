//! Commands recognized in a message's `Content`
//!
//! Matching is case-sensitive. `/connect` and `/acknoledgment` are matched by
//! prefix (the latter keeps the historical spelling clients already send);
//! everything that is not a command is conversational payload.

use crate::error::ProtocolError;
use crate::session::SessionId;

const LIST: &str = "/list";
const CONNECT: &str = "/connect";
const EXIT: &str = "/exit";
const ACKNOWLEDGE: &str = "/acknoledgment";
const HEARTBEAT: &str = "heartbeat";

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// Enumerate the other active sessions
    List,
    /// Pair with the given session
    Connect(SessionId),
    /// Leave the current conversation
    Exit,
    /// Read receipt for a previously received message
    Acknowledge,
    /// Keepalive; only refreshes the activity clock
    Heartbeat,
    /// Anything else, relayed to the current peer
    Chat(&'a str),
}

impl<'a> Command<'a> {
    /// Interpret message content as a command
    ///
    /// Fails only for a `/connect` whose argument is missing or not a session ID.
    pub fn parse(content: &'a str) -> Result<Self, ProtocolError> {
        match content {
            HEARTBEAT => return Ok(Command::Heartbeat),
            LIST => return Ok(Command::List),
            EXIT => return Ok(Command::Exit),
            _ => {}
        }

        if let Some(rest) = content.strip_prefix(CONNECT) {
            return parse_connect_target(rest).map(Command::Connect);
        }

        if content.starts_with(ACKNOWLEDGE) {
            return Ok(Command::Acknowledge);
        }

        Ok(Command::Chat(content))
    }
}

fn parse_connect_target(rest: &str) -> Result<SessionId, ProtocolError> {
    let arg = rest.strip_prefix(' ').ok_or(ProtocolError::ConnectUsage)?;
    arg.trim()
        .parse::<u64>()
        .map(SessionId::new)
        .map_err(|_| ProtocolError::ConnectUsage)
}
