//! Length-prefix frame codec for the serial line.
//!
//! Wire format:
//! ```text
//! ┌────────────┬─────────────────────┐
//! │ Length (1B)│ command text (N B)  │
//! └────────────┴─────────────────────┘
//! ```
//!
//! The decoder accumulates incoming bytes and yields complete frames. A
//! single read may deliver part of a frame or several frames concatenated;
//! both are handled. A zero length byte is not a legal frame and is
//! skipped, which doubles as a resync point after line noise.

use crate::config::COMMAND_BUFFER_SIZE;

/// Maximum frame payload (one command line).
pub const MAX_FRAME: usize = COMMAND_BUFFER_SIZE;

enum DecoderState {
    ReadingLength,
    ReadingPayload { expected: usize, collected: usize },
}

/// Streaming frame decoder.
pub struct FrameDecoder {
    state: DecoderState,
    payload_buf: [u8; MAX_FRAME],
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::ReadingLength,
            payload_buf: [0; MAX_FRAME],
        }
    }

    /// Feed bytes, invoking `on_frame` once per completed payload.
    pub fn feed(&mut self, data: &[u8], mut on_frame: impl FnMut(&[u8])) {
        let mut offset = 0;

        while offset < data.len() {
            match &mut self.state {
                DecoderState::ReadingLength => {
                    let len = data[offset] as usize;
                    offset += 1;
                    if len == 0 {
                        continue;
                    }
                    self.state = DecoderState::ReadingPayload {
                        expected: len,
                        collected: 0,
                    };
                }

                DecoderState::ReadingPayload { expected, collected } => {
                    let needed = *expected - *collected;
                    let available = data.len() - offset;
                    let to_copy = needed.min(available);

                    self.payload_buf[*collected..*collected + to_copy]
                        .copy_from_slice(&data[offset..offset + to_copy]);

                    *collected += to_copy;
                    offset += to_copy;

                    if *collected == *expected {
                        let len = *expected;
                        self.state = DecoderState::ReadingLength;
                        on_frame(&self.payload_buf[..len]);
                    }
                }
            }
        }
    }

    /// Drop any partial frame (e.g. after a line break/reconnect).
    pub fn reset(&mut self) {
        self.state = DecoderState::ReadingLength;
    }
}

/// Encode `payload` as a length-prefixed frame. `None` when the payload
/// does not fit one frame.
pub fn encode_frame(payload: &[u8]) -> Option<heapless::Vec<u8, { MAX_FRAME + 1 }>> {
    if payload.is_empty() || payload.len() > u8::MAX as usize {
        return None;
    }
    let mut out = heapless::Vec::new();
    out.push(payload.len() as u8).ok()?;
    out.extend_from_slice(payload).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(decoder: &mut FrameDecoder, data: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        decoder.feed(data, |f| frames.push(f.to_vec()));
        frames
    }

    #[test]
    fn whole_frame_in_one_read() {
        let mut d = FrameDecoder::new();
        let frames = collect(&mut d, b"\x04help");
        assert_eq!(frames, vec![b"help".to_vec()]);
    }

    #[test]
    fn frame_split_across_reads() {
        let mut d = FrameDecoder::new();
        assert!(collect(&mut d, b"\x0aLED 0").is_empty());
        let frames = collect(&mut d, b" 25 0");
        assert_eq!(frames, vec![b"LED 0 25 0".to_vec()]);
    }

    #[test]
    fn concatenated_frames_in_one_read() {
        let mut d = FrameDecoder::new();
        let frames = collect(&mut d, b"\x02ab\x03cde");
        assert_eq!(frames, vec![b"ab".to_vec(), b"cde".to_vec()]);
    }

    #[test]
    fn zero_length_bytes_are_resync_points() {
        let mut d = FrameDecoder::new();
        let frames = collect(&mut d, b"\x00\x00\x02ok");
        assert_eq!(frames, vec![b"ok".to_vec()]);
    }

    #[test]
    fn reset_discards_partial_payload() {
        let mut d = FrameDecoder::new();
        assert!(collect(&mut d, b"\x05ab").is_empty());
        d.reset();
        let frames = collect(&mut d, b"\x02ok");
        assert_eq!(frames, vec![b"ok".to_vec()]);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let encoded = encode_frame(b"STRING hi").unwrap();
        let mut d = FrameDecoder::new();
        let frames = collect(&mut d, &encoded);
        assert_eq!(frames, vec![b"STRING hi".to_vec()]);
    }

    #[test]
    fn encode_rejects_empty_and_oversized() {
        assert!(encode_frame(b"").is_none());
        assert!(encode_frame(&[b'x'; 256]).is_none());
    }
}
