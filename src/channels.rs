//! Inter-task communication channels.
//!
//! Uses `embassy-sync` bounded MPMC channels to bridge the server
//! callbacks (which run on the HTTP daemon's threads) with the
//! synchronous main loop. Both sides share these static channels
//! without heap allocation.
//!
//! ```text
//! ┌──────────────┐  CommandMsg   ┌──────────────┐
//! │ Server cbs   │─────────────▶│   Main loop   │
//! │ (httpd/ws)   │◀─────────────│   (sync)      │
//! └──────────────┘  OutboundMsg  └──────────────┘
//! ```
//!
//! Senders never block: when a channel is full the message is dropped
//! with a warning, which keeps the daemon threads responsive under a
//! flood of input.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::app::router::{PeerId, TransportId};
use crate::config::COMMAND_BUFFER_SIZE;

/// One command line awaiting execution, tagged with its origin.
pub struct CommandMsg {
    pub origin: TransportId,
    pub text: heapless::String<COMMAND_BUFFER_SIZE>,
}

/// Response line destined for one WebSocket peer.
pub struct OutboundMsg {
    pub peer: PeerId,
    pub line: heapless::String<COMMAND_BUFFER_SIZE>,
}

/// Channel depth for inbound commands.
const CMD_DEPTH: usize = 8;

/// Channel depth for outbound peer responses.
const OUT_DEPTH: usize = 16;

/// Inbound command channel: transport callbacks → main loop.
pub static CMD_CHANNEL: Channel<CriticalSectionRawMutex, CommandMsg, CMD_DEPTH> = Channel::new();

/// Outbound response channel: main loop → WebSocket server.
pub static OUT_CHANNEL: Channel<CriticalSectionRawMutex, OutboundMsg, OUT_DEPTH> = Channel::new();

/// Queue a command without blocking the calling thread.
pub fn submit_command(origin: TransportId, text: &str) {
    let Ok(text) = heapless::String::try_from(text) else {
        warn!("channels: command from {origin:?} exceeds buffer, dropped");
        return;
    };
    if CMD_CHANNEL.try_send(CommandMsg { origin, text }).is_err() {
        warn!("channels: command queue full, dropping input from {origin:?}");
    }
}

/// Queue a response line for one peer without blocking.
pub fn submit_response(peer: PeerId, line: &str) {
    let Ok(line) = heapless::String::try_from(line) else {
        warn!("channels: response line exceeds buffer, dropped");
        return;
    };
    if OUT_CHANNEL.try_send(OutboundMsg { peer, line }).is_err() {
        warn!("channels: response queue full, dropping line for peer {peer}");
    }
}

/// Channel depth for events raised off the main loop.
const EVT_DEPTH: usize = 8;

/// Events raised by server callbacks (update handler), drained by the
/// main loop into the broadcaster.
pub static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, AppEvent, EVT_DEPTH> = Channel::new();

/// Queue an event for broadcast without blocking.
pub fn submit_event(event: AppEvent) {
    if EVENT_CHANNEL.try_send(event).is_err() {
        warn!("channels: event queue full, event dropped");
    }
}

/// [`EventSink`] forwarding into [`EVENT_CHANNEL`]. Handed to state
/// machines driven from server threads, where the broadcaster itself is
/// out of reach.
pub struct QueueEventSink;

impl EventSink for QueueEventSink {
    fn emit(&mut self, event: &AppEvent) {
        submit_event(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_round_trip_through_the_queue() {
        submit_command(TransportId::Serial, "help");
        let msg = CMD_CHANNEL.try_receive().unwrap();
        assert_eq!(msg.origin, TransportId::Serial);
        assert_eq!(msg.text.as_str(), "help");
    }

    #[test]
    fn overflow_drops_instead_of_blocking() {
        // Drain anything a prior test left behind.
        while OUT_CHANNEL.try_receive().is_ok() {}
        for _ in 0..32 {
            submit_response(1, "line");
        }
        let mut drained = 0;
        while OUT_CHANNEL.try_receive().is_ok() {
            drained += 1;
        }
        assert_eq!(drained, 16);
    }
}
