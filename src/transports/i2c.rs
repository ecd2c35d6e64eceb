//! I2C bus adapter.
//!
//! The controller on the other end of the bus writes fixed
//! [`I2C_PACKET_SIZE`]-byte packets; a shorter packet (or a full command
//! buffer) terminates one command. Responses go out through a bounded
//! out-buffer the bus master reads back.

use log::debug;

use crate::app::ports::ResponseSink;
use crate::config::{COMMAND_BUFFER_SIZE, I2C_PACKET_SIZE};

/// Reassembles one command from consecutive fixed-size packets.
pub struct I2cAdapter {
    buf: heapless::Vec<u8, COMMAND_BUFFER_SIZE>,
}

impl I2cAdapter {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
        }
    }

    /// Feed one received packet. Returns the completed command, if any.
    pub fn feed_packet(&mut self, packet: &[u8]) -> Option<heapless::String<COMMAND_BUFFER_SIZE>> {
        let room = COMMAND_BUFFER_SIZE - self.buf.len();
        let take = packet.len().min(room);
        // Infallible: take is bounded by the remaining capacity.
        let _ = self.buf.extend_from_slice(&packet[..take]);

        let complete = packet.len() < I2C_PACKET_SIZE || self.buf.is_full();
        if !complete {
            return None;
        }

        let result = core::str::from_utf8(&self.buf)
            .ok()
            .map(|s| s.trim_end_matches(['\r', '\n', '\0']))
            .and_then(|s| heapless::String::try_from(s).ok());
        if result.is_none() {
            debug!("i2c: dropped malformed message ({} bytes)", self.buf.len());
        }
        self.buf.clear();
        result
    }
}

/// Sink filling the out-buffer register the bus master polls.
pub struct I2cSink<W: FnMut(&[u8])> {
    write: W,
}

impl<W: FnMut(&[u8])> I2cSink<W> {
    pub fn new(write: W) -> Self {
        Self { write }
    }
}

impl<W: FnMut(&[u8])> ResponseSink for I2cSink<W> {
    fn write_line(&mut self, line: &str) {
        let bytes = line.as_bytes();
        (self.write)(&bytes[..bytes.len().min(COMMAND_BUFFER_SIZE - 1)]);
        (self.write)(b"\n");
    }
}
