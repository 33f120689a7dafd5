//! End-to-end relay protocol tests over real TCP connections

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::client::{RECV_TIMEOUT, RawConnection, TestClient};
use common::create_test_server;
use parley_core::{ID_ASSIGNMENT_CONVERSATION, Message, SessionId};

const QUIET: Duration = Duration::from_millis(200);

/// Wait until the server has dropped down to `count` sessions
async fn wait_for_sessions(server: &common::TestServer, count: usize) {
    for _ in 0..100 {
        if server.state.registry.len().await == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("registry never reached {} sessions", count);
}

#[tokio::test]
async fn ids_are_assigned_sequentially_from_one() {
    let server = create_test_server().await;

    let first = TestClient::connect(server.addr).await;
    let second = TestClient::connect(server.addr).await;
    let third = TestClient::connect(server.addr).await;

    assert_eq!((first.id, second.id, third.id), (1, 2, 3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn id_assignment_precedes_racing_deliveries() {
    let server = create_test_server().await;

    for round in 1..=100u64 {
        let target = SessionId::new(round);
        let mut racers = Vec::new();
        for _ in 0..3 {
            let state = Arc::clone(&server.state);
            racers.push(tokio::spawn(async move {
                loop {
                    if let Some(transport) = state.registry.transport(target).await {
                        let _ = transport.deliver(Message::notice(target, "early"));
                        return;
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }

        let mut conn = RawConnection::connect(server.addr).await;
        let first = conn
            .recv_timeout(RECV_TIMEOUT)
            .await
            .expect("Timeout waiting for first frame")
            .expect("Connection closed before first frame");
        assert_eq!(
            first.conversation_id, ID_ASSIGNMENT_CONVERSATION,
            "round {round}: first frame was {:?}",
            first.content
        );
        assert_eq!(first.receiver_id, target.as_wire());

        for racer in racers {
            racer.await.unwrap();
        }
    }
}

#[tokio::test]
async fn ids_are_not_reused_after_disconnect() {
    let server = create_test_server().await;

    let first = TestClient::connect(server.addr).await;
    drop(first);
    wait_for_sessions(&server, 0).await;

    let second = TestClient::connect(server.addr).await;
    assert_eq!(second.id, 2);
}

#[tokio::test]
async fn heartbeat_gets_no_reply() {
    let server = create_test_server().await;
    let mut client = TestClient::connect(server.addr).await;

    client.send("heartbeat").await;
    client.expect_no_message(QUIET).await;
}

#[tokio::test]
async fn connect_to_unknown_client() {
    let server = create_test_server().await;
    let mut client = TestClient::connect(server.addr).await;

    client.send("/connect 999").await;
    assert_eq!(client.recv_content().await, "Client not found.");
}

#[tokio::test]
async fn connect_without_valid_id_shows_usage() {
    let server = create_test_server().await;
    let mut client = TestClient::connect(server.addr).await;

    client.send("/connect abc").await;
    assert_eq!(client.recv_content().await, "Usage: /connect <client_id>");
}

#[tokio::test]
async fn chat_before_connect_is_rejected() {
    let server = create_test_server().await;
    let mut client = TestClient::connect(server.addr).await;

    client.send("hello?").await;
    assert_eq!(
        client.recv_content().await,
        "You must start a conversation with /connect <client_id> before sending messages."
    );
}

#[tokio::test]
async fn paired_message_is_relayed_and_acknowledged() {
    let server = create_test_server().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;

    alice.connect_to(bob.id).await;
    alice.send("Hello").await;

    let relayed = bob.recv().await;
    assert_eq!(relayed.sender_id, alice.id);
    assert_eq!(relayed.receiver_id, bob.id);
    assert_eq!(relayed.conversation_id, bob.id);
    assert_eq!(relayed.content, "Hello");

    let ack = alice.recv().await;
    assert_eq!(ack.sender_id, 0);
    assert_eq!(ack.content, "Message delivered.");
}

#[tokio::test]
async fn pairing_is_one_directional() {
    let server = create_test_server().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;

    alice.connect_to(bob.id).await;
    bob.send("can you hear me?").await;

    assert_eq!(
        bob.recv_content().await,
        "You must start a conversation with /connect <client_id> before sending messages."
    );
    alice.expect_no_message(QUIET).await;
}

#[tokio::test]
async fn acknowledgment_reaches_author() {
    let server = create_test_server().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;

    alice.connect_to(bob.id).await;
    alice.send("ping").await;
    assert_eq!(bob.recv_content().await, "ping");
    assert_eq!(alice.recv_content().await, "Message delivered.");

    bob.send_to(alice.id, "/acknoledgment").await;
    let reached = alice.recv().await;
    assert_eq!(reached.content, "Message Reached!.");
    assert_eq!(reached.conversation_id, alice.id);
    bob.expect_no_message(QUIET).await;
}

#[tokio::test]
async fn exit_returns_to_idle() {
    let server = create_test_server().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;

    alice.connect_to(bob.id).await;
    alice.send("/exit").await;
    assert_eq!(
        alice.recv_content().await,
        "Exited conversation. You can start a new one with /connect <client_id>."
    );

    alice.send("still there?").await;
    assert!(alice.recv_content().await.starts_with("You must start a conversation"));
    bob.expect_no_message(QUIET).await;
}

#[tokio::test]
async fn departed_peer_is_reported_on_next_send() {
    let server = create_test_server().await;
    let mut alice = TestClient::connect(server.addr).await;
    let bob = TestClient::connect(server.addr).await;

    alice.connect_to(bob.id).await;
    drop(bob);
    wait_for_sessions(&server, 1).await;

    alice.send("hello?").await;
    assert_eq!(
        alice.recv_content().await,
        "The client you were connected to is no longer available."
    );

    alice.send("anyone?").await;
    assert!(alice.recv_content().await.starts_with("You must start a conversation"));
}

#[tokio::test]
async fn list_shows_other_clients_in_id_order() {
    let server = create_test_server().await;
    let mut first = TestClient::connect(server.addr).await;
    let _second = TestClient::connect(server.addr).await;
    let _third = TestClient::connect(server.addr).await;

    first.send("/list").await;
    assert_eq!(
        first.recv_content().await,
        "Active clients:\nID: 2, Name: Anonymous\nID: 3, Name: Anonymous\n"
    );
}

#[tokio::test]
async fn list_when_alone_has_header_only() {
    let server = create_test_server().await;
    let mut client = TestClient::connect(server.addr).await;

    client.send("/list").await;
    assert_eq!(client.recv_content().await, "Active clients:\n");
}

#[tokio::test]
async fn two_frames_in_one_write_are_both_handled() {
    let server = create_test_server().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.connect_to(bob.id).await;

    let batch = format!(
        "{}\n{}\n",
        serde_json::json!({"SenderId": alice.id, "Content": "one"}),
        serde_json::json!({"SenderId": alice.id, "Content": "two"}),
    );
    alice.conn.send_raw(batch.as_bytes()).await;

    assert_eq!(bob.recv_content().await, "one");
    assert_eq!(bob.recv_content().await, "two");
}

#[tokio::test]
async fn frame_split_across_writes_is_reassembled() {
    let server = create_test_server().await;
    let mut alice = TestClient::connect(server.addr).await;
    let mut bob = TestClient::connect(server.addr).await;
    alice.connect_to(bob.id).await;

    let frame = format!(
        "{}\n",
        serde_json::json!({"SenderId": alice.id, "Content": "stitched together"})
    );
    let (head, tail) = frame.as_bytes().split_at(frame.len() / 2);
    alice.conn.send_raw(head).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    alice.conn.send_raw(tail).await;

    assert_eq!(bob.recv_content().await, "stitched together");
}

#[tokio::test]
async fn malformed_frame_is_reported_and_connection_survives() {
    let server = create_test_server().await;
    let mut client = TestClient::connect(server.addr).await;

    client.conn.send_raw(b"this is not json\n").await;
    assert!(client.recv_content().await.starts_with("Invalid message:"));

    client.send("/list").await;
    assert_eq!(client.recv_content().await, "Active clients:\n");
}

#[tokio::test]
async fn repeated_malformed_frames_disconnect() {
    let server = create_test_server().await;
    let mut client = TestClient::connect(server.addr).await;

    client.conn.send_raw(b"{\n[\nnope\n").await;

    // Every error reply, including the last, is flushed before the close
    for _ in 0..3 {
        assert!(client.recv_content().await.starts_with("Invalid message:"));
    }
    client.expect_closed(Duration::from_secs(5)).await;
    wait_for_sessions(&server, 0).await;
}

#[tokio::test]
async fn oversized_frame_disconnects() {
    let config = parley_server::ServerConfig::new("127.0.0.1", 0).with_max_frame_length(128);
    let server = common::create_test_server_with_config(config).await;
    let mut client = TestClient::connect(server.addr).await;

    client.send(&"x".repeat(1024)).await;

    client.expect_closed(Duration::from_secs(5)).await;
    wait_for_sessions(&server, 0).await;
}

#[tokio::test]
async fn shutdown_closes_open_sessions() {
    let server = create_test_server().await;
    let mut client = TestClient::connect(server.addr).await;

    server.shutdown.cancel();

    client.expect_closed(Duration::from_secs(5)).await;
}
