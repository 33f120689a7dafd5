//! Parley chat command: an interactive terminal client for a relay
//!
//! Lines typed on stdin are sent as message content, so relay commands such as
//! `/list` and `/connect 2` are typed directly. Every message from a peer is
//! answered with a read receipt, and a heartbeat keeps the session alive while
//! the user is idle. Typing `exit` quits.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use futures::{SinkExt, StreamExt};
use parley_core::{FrameCodec, ID_ASSIGNMENT_CONVERSATION, Message, SessionId};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::debug;

use crate::config::ConfigLoader;

const ACKNOWLEDGMENT: &str = "/acknoledgment";
const HEARTBEAT: &str = "heartbeat";
const EXIT: &str = "exit";

/// Arguments for the chat command
#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Relay host to connect to
    #[arg(long)]
    pub host: Option<String>,

    /// Relay port to connect to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Seconds between heartbeats (0 disables them)
    #[arg(long)]
    pub heartbeat_secs: Option<u64>,
}

/// Run the chat command
pub async fn run(args: ChatArgs) -> Result<()> {
    let config = ConfigLoader::load()?.chat;
    let host = args.host.unwrap_or(config.host);
    let port = args.port.unwrap_or(config.port);
    let heartbeat = heartbeat_period(args.heartbeat_secs.unwrap_or(config.heartbeat_secs));

    let stream = TcpStream::connect((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to connect to {}:{}", host, port))?;
    debug!(%host, port, "Connected to relay");

    let mut stdout = tokio::io::stdout();
    run_session(stream, tokio::io::stdin(), &mut stdout, heartbeat).await
}

fn heartbeat_period(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Drive one chat session until the user exits or the relay hangs up
pub async fn run_session<S, I, O>(
    stream: S,
    input: I,
    output: &mut O,
    heartbeat: Option<Duration>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut frames = FramedRead::new(read_half, FrameCodec::new());
    let mut sink = FramedWrite::new(write_half, FrameCodec::new());

    let assignment = match frames.next().await {
        Some(frame) => Message::decode(&frame?)?,
        None => bail!("Relay closed the connection before assigning an ID"),
    };
    if assignment.conversation_id != ID_ASSIGNMENT_CONVERSATION {
        bail!("Expected an ID assignment, got {:?}", assignment.content);
    }
    let id = SessionId::from_wire(assignment.receiver_id)
        .context("Relay assigned an invalid client ID")?;
    print_line(output, &render(&assignment)).await?;

    let mut lines = FramedRead::new(input, LinesCodec::new());
    let mut ticker = heartbeat.map(|period| {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    loop {
        tokio::select! {
            frame = frames.next() => {
                let Some(frame) = frame else {
                    print_line(output, "Disconnected from relay.").await?;
                    break;
                };
                let message = Message::decode(&frame?)?;
                print_line(output, &render(&message)).await?;
                if !message.is_from_server() {
                    sink.send(Message::outgoing(id, message.sender_id, ACKNOWLEDGMENT)).await?;
                }
            }
            line = lines.next() => {
                let Some(line) = line else { break };
                let line = line?;
                match line.trim() {
                    EXIT => break,
                    "" => continue,
                    _ => sink.send(Message::outgoing(id, 0, line)).await?,
                }
            }
            _ = next_tick(&mut ticker) => {
                sink.send(Message::outgoing(id, 0, HEARTBEAT)).await?;
            }
        }
    }

    Ok(())
}

/// Wait for the next heartbeat, or forever when heartbeats are disabled
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Render a received message for the terminal
fn render(message: &Message) -> String {
    if message.is_from_server() {
        format!("Server: {}", message.content)
    } else {
        format!("[{}] {}", message.sender_id, message.content)
    }
}

async fn print_line<O: AsyncWrite + Unpin>(output: &mut O, line: &str) -> Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}
