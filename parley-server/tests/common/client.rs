//! TCP test client for protocol testing
//!
//! Provides both low-level RawConnection and high-level TestClient.
//!
//! Note: Some methods may appear unused because they're only used in specific
//! test files and clippy checks each test independently.

use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use parley_core::{FrameCodec, Message};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::FramedRead;

/// How long a test waits for a frame before giving up
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Low-level connection: raw bytes out, decoded frames in
pub struct RawConnection {
    writer: OwnedWriteHalf,
    frames: FramedRead<OwnedReadHalf, FrameCodec>,
}

impl RawConnection {
    /// Connect to the relay
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("Failed to connect");
        let (read_half, writer) = stream.into_split();
        Self {
            writer,
            frames: FramedRead::new(read_half, FrameCodec::new()),
        }
    }

    /// Write bytes exactly as given
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Write one JSON frame followed by a newline
    pub async fn send_json(&mut self, value: &serde_json::Value) {
        let mut line = serde_json::to_vec(value).unwrap();
        line.push(b'\n');
        self.send_raw(&line).await;
    }

    /// Receive the next frame, or None once the server has closed the socket
    pub async fn recv(&mut self) -> Option<Message> {
        match self.frames.next().await {
            Some(Ok(frame)) => Some(Message::decode(&frame).expect("server sent invalid JSON")),
            // A reset after the server drops us counts as closed
            Some(Err(_)) | None => None,
        }
    }

    /// Receive with timeout; outer None is a timeout, inner None is EOF
    pub async fn recv_timeout(&mut self, duration: Duration) -> Option<Option<Message>> {
        tokio::time::timeout(duration, self.recv()).await.ok()
    }
}

/// High-level test client with helper methods
pub struct TestClient {
    pub conn: RawConnection,
    pub id: i64,
}

impl TestClient {
    /// Connect to server (consumes the ID assignment notice)
    #[allow(dead_code)]
    pub async fn connect(addr: SocketAddr) -> Self {
        let mut conn = RawConnection::connect(addr).await;

        let assignment = conn
            .recv_timeout(RECV_TIMEOUT)
            .await
            .flatten()
            .expect("Expected ID assignment on connect");
        assert_eq!(assignment.sender_id, 0);
        assert_eq!(assignment.conversation_id, -1);
        assert_eq!(
            assignment.content,
            format!("Your assigned client ID is {}.", assignment.receiver_id)
        );

        Self {
            id: assignment.receiver_id,
            conn,
        }
    }

    /// Send a frame with the given content, as a well-behaved client would
    #[allow(dead_code)]
    pub async fn send(&mut self, content: &str) {
        self.send_to(0, content).await;
    }

    /// Send a frame with an explicit ReceiverId
    #[allow(dead_code)]
    pub async fn send_to(&mut self, receiver_id: i64, content: &str) {
        self.conn
            .send_json(&serde_json::json!({
                "SenderId": self.id,
                "ReceiverId": receiver_id,
                "Content": content,
                "Timestamp": "2026-01-01T00:00:00Z",
                "ConversationId": 0,
            }))
            .await;
    }

    /// Receive next message, panicking on timeout or EOF
    #[allow(dead_code)]
    pub async fn recv(&mut self) -> Message {
        self.conn
            .recv_timeout(RECV_TIMEOUT)
            .await
            .expect("Timed out waiting for message")
            .expect("Connection closed")
    }

    /// Receive next message and return its content
    #[allow(dead_code)]
    pub async fn recv_content(&mut self) -> String {
        self.recv().await.content
    }

    /// Assert no message received within duration
    #[allow(dead_code)]
    pub async fn expect_no_message(&mut self, duration: Duration) {
        if let Some(received) = self.conn.recv_timeout(duration).await {
            panic!("Expected no message but received {:?}", received);
        }
    }

    /// Assert the server closes the connection within duration
    #[allow(dead_code)]
    pub async fn expect_closed(&mut self, duration: Duration) {
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match self.conn.recv_timeout(remaining).await {
                Some(None) => return,
                Some(Some(_)) => continue,
                None => panic!("Expected connection to close"),
            }
        }
    }

    /// Pair with another client and consume the confirmation
    #[allow(dead_code)]
    pub async fn connect_to(&mut self, other: i64) {
        self.send(&format!("/connect {}", other)).await;
        assert_eq!(
            self.recv_content().await,
            format!("You are now connected to Client {}. Type your messages.", other)
        );
    }
}
