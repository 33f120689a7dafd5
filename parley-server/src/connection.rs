//! Connection handling
//!
//! Each accepted socket is split in two. The read half feeds the
//! [`CommandDispatcher`]; the write half is owned by a writer task draining the
//! session's outbound queue. Both stop when the session's token is cancelled,
//! whether by the reader ending, a failed write, eviction, or server shutdown.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parley_core::{FrameCodec, Message, SessionId, Transport, TransportError};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::CommandDispatcher;
use crate::state::AppState;

/// Why a session's read loop ended
#[derive(Debug)]
enum Disconnect {
    /// The client closed its end
    Eof,
    /// Read failure or unrecoverable framing error
    Transport(TransportError),
    /// Too many consecutive malformed frames
    ProtocolErrors(u32),
    /// Transport closed by eviction, a failed write, or shutdown
    Closed,
}

/// Serve one accepted connection until it ends
///
/// Registers the session, sends its ID assignment, then runs the read loop.
/// On return the session has been removed from the registry and both halves
/// of the socket are closed.
pub async fn handle_connection(
    stream: TcpStream,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) {
    let addr = stream.peer_addr().ok();
    let (read_half, write_half) = stream.into_split();

    let closer = shutdown.child_token();
    let (transport, outbox) = Transport::channel(state.config.outbound_buffer, closer.clone());
    let id = state.registry.admit(transport).await;

    let active = state.registry.len().await;
    info!(session_id = %id, addr = ?addr, active, "Client connected");

    let writer = tokio::spawn(write_loop(
        id,
        write_half,
        outbox,
        closer.clone(),
        state.config.write_timeout,
    ));

    let reason = read_loop(id, read_half, &state, &closer).await;

    let removed = state.registry.remove(id).await.is_some();
    closer.cancel();
    if let Err(e) = writer.await {
        warn!(session_id = %id, error = %e, "Writer task failed");
    }

    if removed {
        let active = state.registry.len().await;
        info!(session_id = %id, reason = ?reason, active, "Client disconnected");
    } else {
        debug!(session_id = %id, reason = ?reason, "Connection closed after eviction");
    }
}

async fn read_loop(
    id: SessionId,
    read_half: OwnedReadHalf,
    state: &AppState,
    closer: &CancellationToken,
) -> Disconnect {
    let mut frames = FramedRead::new(
        read_half,
        FrameCodec::with_max_length(state.config.max_frame_length),
    );
    let dispatcher = CommandDispatcher::new(id, state);
    let mut protocol_errors = 0u32;

    loop {
        let frame = tokio::select! {
            _ = closer.cancelled() => return Disconnect::Closed,
            frame = frames.next() => frame,
        };

        let body = match frame {
            Some(Ok(body)) => body,
            Some(Err(e)) => return Disconnect::Transport(e),
            None => return Disconnect::Eof,
        };

        match dispatcher.handle_frame(&body).await {
            Ok(()) => protocol_errors = 0,
            Err(e) => {
                protocol_errors += 1;
                warn!(session_id = %id, error = %e, count = protocol_errors, "Invalid frame");
                dispatcher.reply(format!("Invalid message: {e}")).await;
                if protocol_errors >= state.config.max_protocol_errors {
                    return Disconnect::ProtocolErrors(protocol_errors);
                }
            }
        }
    }
}

async fn write_loop(
    id: SessionId,
    write_half: OwnedWriteHalf,
    mut outbox: mpsc::Receiver<Message>,
    closer: CancellationToken,
    write_timeout: Duration,
) {
    let mut sink = FramedWrite::new(write_half, FrameCodec::new());

    loop {
        // Queued messages are flushed before a close is honored
        let message = tokio::select! {
            biased;
            message = outbox.recv() => match message {
                Some(message) => message,
                None => break,
            },
            _ = closer.cancelled() => break,
        };

        let result = match tokio::time::timeout(write_timeout, sink.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::WriteTimeout(write_timeout)),
        };

        if let Err(e) = result {
            warn!(session_id = %id, error = %e, "Write failed, closing session");
            closer.cancel();
            break;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(session_id = %id, error = %e, "Socket shutdown failed");
    }
}
