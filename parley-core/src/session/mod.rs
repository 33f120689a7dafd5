//! Session tracking

pub mod registry;
pub mod state;

// Re-export key types for convenience
pub use registry::SessionRegistry;
pub use state::{ConversationState, Session, SessionId, Transport};
