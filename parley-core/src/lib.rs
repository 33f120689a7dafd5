//! parley-core: core types for the parley relay
//!
//! This crate provides the building blocks shared by the server and clients:
//!
//! - **Wire protocol** - [`Message`], the JSON object carried by every frame, and
//!   [`Command`] for interpreting its content
//! - **Framing** - [`FrameCodec`], newline-delimited JSON over any byte stream
//! - **Sessions** - [`Session`] and [`SessionRegistry`] tracking who is connected
//!   and who is talking to whom
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               SessionRegistry                │
//! │  ┌───────────────┐  ┌───────────────┐        │
//! │  │  Session 1    │  │  Session 2    │  ...   │
//! │  │  peer: 2      │  │  peer: None   │        │
//! │  │  Transport ───┼──┼─> writer task │        │
//! │  └───────────────┘  └───────────────┘        │
//! └──────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod protocol;
pub mod session;

// Re-export key types for convenience
pub use error::{ParleyError, ParleyResult, ProtocolError, RoutingError, TransportError};
pub use protocol::{
    Command, DEFAULT_MAX_FRAME_LENGTH, FrameCodec, ID_ASSIGNMENT_CONVERSATION, Message,
    NOTICE_CONVERSATION, SERVER_SENDER_ID,
};
pub use session::{ConversationState, Session, SessionId, SessionRegistry, Transport};
