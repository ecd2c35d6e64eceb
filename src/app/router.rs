//! Command router — single-flight dispatch from any transport to the parser.
//!
//! Every transport adapter reduces its medium to `(command text, response
//! sink)` and hands both to [`CommandRouter::submit`]. The router binds the
//! sink for exactly the duration of one parser invocation, so response
//! lines can only ever reach the client that issued the command.
//!
//! The binding is a [`CommandContext`] value owned by the call, not a
//! process-wide "current client" pointer: `&mut self` plus by-value context
//! ownership make a second concurrent submission unrepresentable, and the
//! binding ends unconditionally when `submit` returns — parser misbehaviour
//! included — so nothing can leak to a stale or wrong client.

use log::debug;

use super::ports::{ParserPort, ResponseSink};

/// Identifies the physical channel a command arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportId {
    Serial,
    I2c,
    /// Interactive WebSocket peer; responses mirror to the diagnostic log.
    WebSocket(PeerId),
    /// One-shot HTTP `/run` request.
    HttpRun,
}

/// WebSocket peer handle as assigned by the server.
pub type PeerId = u16;

impl TransportId {
    /// Interactive origins get their response lines mirrored to the log.
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::WebSocket(_))
    }
}

/// Transient binding of one command's origin to its response sink.
///
/// Exclusively held by the router for the duration of one execution; never
/// persisted; at most one alive system-wide.
pub struct CommandContext<'a> {
    pub origin: TransportId,
    pub sink: &'a mut dyn ResponseSink,
}

impl<'a> CommandContext<'a> {
    pub fn new(origin: TransportId, sink: &'a mut dyn ResponseSink) -> Self {
        Self { origin, sink }
    }
}

/// Serializes command execution and routes responses to their origin.
pub struct CommandRouter {
    executed: u64,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self { executed: 0 }
    }

    /// Execute one command. Response lines emitted by the parser flow
    /// through `ctx.sink` and nowhere else; a command producing zero lines
    /// is valid, not an error.
    ///
    /// Execution order is arrival order: the main loop is the single
    /// caller, and `&mut self` rules out overlap even if a second caller
    /// ever appeared.
    pub fn submit(&mut self, parser: &mut impl ParserPort, ctx: CommandContext<'_>, text: &str) {
        self.executed += 1;
        let origin = ctx.origin;
        let interactive = origin.is_interactive();
        debug!("router: {:?} submitted {} byte(s)", origin, text.len());

        let sink = ctx.sink;
        parser.parse(
            text,
            &mut |line| {
                sink.write_line(line);
                if interactive {
                    debug!("router: {:?} <- {}", origin, line);
                }
            },
            interactive,
        );
        // ctx (and with it the sink binding) dies here, parser errors or not.
    }

    /// Total commands executed since boot.
    pub fn executed(&self) -> u64 {
        self.executed
    }
}
