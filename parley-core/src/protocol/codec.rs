//! Newline-delimited JSON framing
//!
//! Every frame is one compact JSON object followed by `\n`. Compact JSON escapes
//! control characters inside strings, so the delimiter never occurs within a
//! payload. Reads are buffered by [`LinesCodec`]: a chunk holding several frames
//! yields them one by one, and a partial frame waits for the rest of its line.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec};

use super::message::Message;
use crate::error::TransportError;

/// Largest accepted frame, excluding the delimiter
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Splits a byte stream into frame bodies and writes [`Message`]s as frames.
///
/// Decoding yields the raw body of each non-blank line; turning a body into a
/// [`Message`] is left to the caller so that a malformed body stays a
/// per-frame protocol error instead of ending the stream.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    lines: LinesCodec,
}

impl FrameCodec {
    /// Codec with [`DEFAULT_MAX_FRAME_LENGTH`]
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    /// Codec rejecting frames longer than `max_length` bytes
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_length),
        }
    }

    /// Maximum accepted frame length
    pub fn max_length(&self) -> usize {
        self.lines.max_length()
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, TransportError> {
        loop {
            match self.lines.decode(src)? {
                Some(line) if line.trim().is_empty() => continue,
                frame => return Ok(frame),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, TransportError> {
        loop {
            match self.lines.decode_eof(src)? {
                Some(line) if line.trim().is_empty() => continue,
                frame => return Ok(frame),
            }
        }
    }
}

impl Encoder<Message> for FrameCodec {
    type Error = TransportError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), TransportError> {
        let json = serde_json::to_string(&item).map_err(TransportError::Encode)?;
        self.lines.encode(json, dst)?;
        Ok(())
    }
}
