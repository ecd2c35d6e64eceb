//! Outbound system events.
//!
//! The connectivity manager and update controller emit these through the
//! [`EventSink`](super::ports::EventSink) port; the broadcaster fans them
//! out to every subscribed long-lived listener as a named event. They are
//! deliberately distinct from command responses — a listener receives them
//! whether or not it ever submitted a command.

use core::fmt::Write;

use crate::error::UpdateError;
use crate::net::connectivity::ConnectionState;

/// Event-stream channel for firmware-update progress and outcomes.
pub const CHANNEL_OTA: &str = "ota";
/// Event-stream channel for connection lifecycle changes.
pub const CHANNEL_NET: &str = "net";
/// Channel of the implicit greeting sent to a listener on subscribe.
pub const CHANNEL_HELLO: &str = "hello";

/// Structured events emitted by the network core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The connectivity manager moved to a new state.
    ConnectionChanged(ConnectionState),

    /// An update session opened (chunk 0 accepted).
    UpdateStarted { source: heapless::String<32> },

    /// Bytes received so far in the active session.
    UpdateProgress { bytes: u32 },

    /// The image validated; a restart is pending.
    UpdateApplied { bytes: u32 },

    /// The session failed; no restart will occur.
    UpdateFailed(UpdateError),
}

impl AppEvent {
    /// Named-event channel this event is delivered on.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::ConnectionChanged(_) => CHANNEL_NET,
            Self::UpdateStarted { .. }
            | Self::UpdateProgress { .. }
            | Self::UpdateApplied { .. }
            | Self::UpdateFailed(_) => CHANNEL_OTA,
        }
    }

    /// Human-readable payload, matching what the web UI displays verbatim.
    pub fn message(&self) -> heapless::String<96> {
        let mut out = heapless::String::new();
        let _ = match self {
            Self::ConnectionChanged(state) => write!(out, "{state}"),
            Self::UpdateStarted { source } => write!(out, "Update Start: {source}"),
            Self::UpdateProgress { bytes } => write!(out, "Progress: {bytes}B"),
            Self::UpdateApplied { bytes } => write!(out, "Update Success: {bytes}B"),
            Self::UpdateFailed(e) => write!(out, "Update Failed: {e}"),
        };
        out
    }
}
