//! Serial line adapter.
//!
//! One command per frame (see [`frame`](super::frame)). Frames that are
//! not valid UTF-8 are dropped at this boundary without comment to the
//! sender, per the malformed-input policy.

use log::debug;

use crate::app::ports::ResponseSink;
use crate::config::COMMAND_BUFFER_SIZE;

use super::frame::{FrameDecoder, encode_frame};

/// Reassembles command lines from the raw serial byte stream.
pub struct SerialAdapter {
    decoder: FrameDecoder,
}

impl SerialAdapter {
    pub fn new() -> Self {
        Self {
            decoder: FrameDecoder::new(),
        }
    }

    /// Feed received bytes; `submit` is called once per complete command.
    pub fn feed(&mut self, data: &[u8], mut submit: impl FnMut(&str)) {
        self.decoder.feed(data, |payload| {
            match core::str::from_utf8(payload) {
                Ok(cmd) => submit(cmd.trim_end_matches(['\r', '\n'])),
                Err(_) => debug!("serial: dropped non-UTF-8 frame ({} bytes)", payload.len()),
            }
        });
    }

    /// Discard a partial frame after a detected line break.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }
}

/// Sink writing response lines back as frames on the same serial line.
/// `write` is the adapter's raw byte output (UART TX).
pub struct SerialSink<W: FnMut(&[u8])> {
    write: W,
}

impl<W: FnMut(&[u8])> SerialSink<W> {
    pub fn new(write: W) -> Self {
        Self { write }
    }
}

impl<W: FnMut(&[u8])> ResponseSink for SerialSink<W> {
    fn write_line(&mut self, line: &str) {
        // Oversized lines are truncated at the frame limit rather than
        // silently dropped; the CLI keeps lines far below it in practice.
        let bytes = line.as_bytes();
        let clipped = &bytes[..bytes.len().min(COMMAND_BUFFER_SIZE - 1)];
        if let Some(framed) = encode_frame(clipped) {
            (self.write)(&framed);
        }
    }
}
