//! Wire protocol: framing, messages and commands

pub mod codec;
pub mod command;
pub mod message;

pub use codec::{DEFAULT_MAX_FRAME_LENGTH, FrameCodec};
pub use command::Command;
pub use message::{
    ID_ASSIGNMENT_CONVERSATION, Message, NOTICE_CONVERSATION, SERVER_SENDER_ID,
};
