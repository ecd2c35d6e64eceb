//! WebSocket adapter and client registry.
//!
//! Text data frames carry commands; everything else is transport
//! housekeeping. The adapter records the sending peer so the response sink
//! can be bound to exactly that peer, and it maintains the registry of
//! long-lived clients that the event stream and diagnostics consult.

use log::{debug, warn};

use crate::app::ports::ResponseSink;
use crate::app::router::PeerId;
use crate::config::{COMMAND_BUFFER_SIZE, MAX_WS_CLIENTS};

/// Bounded set of currently connected peers. No ordering guarantee.
pub struct ClientRegistry {
    peers: heapless::Vec<PeerId, MAX_WS_CLIENTS>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            peers: heapless::Vec::new(),
        }
    }

    /// Track a newly connected peer. Returns `false` when the table is
    /// full; the server should refuse the connection in that case.
    pub fn add(&mut self, peer: PeerId) -> bool {
        if self.contains(peer) {
            return true;
        }
        self.peers.push(peer).is_ok()
    }

    /// Forget a peer. Harmless if already gone (disconnect and error can
    /// both fire for the same peer).
    pub fn remove(&mut self, peer: PeerId) {
        self.peers.retain(|p| *p != peer);
    }

    pub fn contains(&self, peer: PeerId) -> bool {
        self.peers.iter().any(|p| *p == peer)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Lifecycle and data events as delivered by the WebSocket server.
#[derive(Debug)]
pub enum WsEvent<'a> {
    Connect { peer: PeerId },
    Disconnect { peer: PeerId },
    Error { peer: PeerId, code: u16 },
    Pong { peer: PeerId },
    Text { peer: PeerId, payload: &'a [u8] },
    Binary { peer: PeerId },
}

/// Command extracted from a text frame, tagged with its responder.
pub struct WsCommand {
    pub peer: PeerId,
    pub text: heapless::String<COMMAND_BUFFER_SIZE>,
}

/// Translates server events into registry updates and commands.
pub struct WsAdapter {
    registry: ClientRegistry,
}

impl WsAdapter {
    pub fn new() -> Self {
        Self {
            registry: ClientRegistry::new(),
        }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Process one event. Only a text frame from a tracked peer yields a
    /// command; housekeeping events update the registry and log.
    pub fn handle(&mut self, event: WsEvent<'_>) -> Option<WsCommand> {
        match event {
            WsEvent::Connect { peer } => {
                if self.registry.add(peer) {
                    debug!("ws: client {peer} connected ({} total)", self.registry.len());
                } else {
                    warn!("ws: registry full, client {peer} not tracked");
                }
                None
            }
            WsEvent::Disconnect { peer } => {
                self.registry.remove(peer);
                debug!("ws: client {peer} disconnected");
                None
            }
            WsEvent::Error { peer, code } => {
                self.registry.remove(peer);
                warn!("ws: client {peer} error ({code})");
                None
            }
            WsEvent::Pong { peer } => {
                debug!("ws: pong from {peer}");
                None
            }
            WsEvent::Binary { peer } => {
                // Binary frames are housekeeping-only on this endpoint.
                debug!("ws: ignoring binary frame from {peer}");
                None
            }
            WsEvent::Text { peer, payload } => {
                let text = core::str::from_utf8(payload)
                    .ok()
                    .map(|s| s.trim_end_matches(['\r', '\n']))
                    .and_then(|s| heapless::String::try_from(s).ok());
                match text {
                    Some(text) => {
                        debug!("ws: {} byte(s) from client {peer}", text.len());
                        Some(WsCommand { peer, text })
                    }
                    None => {
                        debug!("ws: dropped malformed text frame from {peer}");
                        None
                    }
                }
            }
        }
    }
}

/// Sink delivering response lines to exactly one peer. `send` is the
/// server's per-peer text-frame write.
pub struct WsPeerSink<W: FnMut(PeerId, &str)> {
    peer: PeerId,
    send: W,
}

impl<W: FnMut(PeerId, &str)> WsPeerSink<W> {
    pub fn new(peer: PeerId, send: W) -> Self {
        Self { peer, send }
    }
}

impl<W: FnMut(PeerId, &str)> ResponseSink for WsPeerSink<W> {
    fn write_line(&mut self, line: &str) {
        (self.send)(self.peer, line);
    }
}
