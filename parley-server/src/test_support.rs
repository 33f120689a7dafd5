//! Helpers for unit tests that drive sessions without sockets

use parley_core::{Message, SessionId, SessionRegistry, Transport};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Register a session whose outbound queue is observable through the receiver
pub async fn register(registry: &SessionRegistry) -> (SessionId, mpsc::Receiver<Message>) {
    register_with_capacity(registry, 16).await
}

pub async fn register_with_capacity(
    registry: &SessionRegistry,
    capacity: usize,
) -> (SessionId, mpsc::Receiver<Message>) {
    let (transport, rx) = Transport::channel(capacity, CancellationToken::new());
    let id = registry.register(transport).await;
    (id, rx)
}

/// Assert nothing has been queued for a session
pub fn expect_silence(rx: &mut mpsc::Receiver<Message>) {
    if let Ok(message) = rx.try_recv() {
        panic!("expected no message, got {message:?}");
    }
}
